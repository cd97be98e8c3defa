/*!
Reading R's global option table

`getOption()` without evaluating R code: install the symbol, look it up with
`Rf_GetOption1`, decode the first element of the result. Plain variables
(`R.version.string`) are the one place R code is evaluated, guarded by
`R_tryEvalSilent`. Integer and logical scalars are read through the integer
payload offset measured in `RuntimeHandle::post_setup`.
*/

use crate::ffi::{NA_INTEGER, Sexp, Symbols, sexptype};
use std::ffi::{CStr, CString, c_int};

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Logical(bool),
    Integer(i32),
    Real(f64),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Truthiness the way R's `isTRUE(x == 1)` style checks read it
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Logical(value) => Some(*value),
            OptionValue::Integer(value) => Some(*value != 0),
            OptionValue::Real(value) => Some(*value != 0.0),
            OptionValue::Text(text) => match text.as_str() {
                "TRUE" | "true" | "T" => Some(true),
                "FALSE" | "false" | "F" => Some(false),
                _ => None,
            },
        }
    }
}

/// Read an integer payload at `offset` bytes past the object header
///
/// # Safety
/// `sexp` must be a live integer or logical vector of length >= 1 and
/// `offset` the validated payload offset for this R build.
pub unsafe fn read_integer(sexp: Sexp, offset: isize) -> i32 {
    unsafe { *sexp.0.cast::<u8>().offset(offset).cast::<i32>() }
}

/// Typed view of R's options
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    symbols: Symbols,
    int_offset: isize,
}

impl RuntimeOptions {
    pub(crate) fn new(symbols: Symbols, int_offset: isize) -> Self {
        RuntimeOptions {
            symbols,
            int_offset,
        }
    }

    /// `getOption(name)`; `None` if unset, NA, empty or of another type
    pub fn get(&self, name: &str) -> Option<OptionValue> {
        let c_name = CString::new(name).ok()?;
        let s = &self.symbols;
        let decoded = unsafe {
            let symbol = (s.install)(c_name.as_ptr());
            self.decode(name, (s.get_option1)(symbol))
        };
        tracing::trace!(name, ?decoded, "read option");
        decoded
    }

    /// Value of the R variable `name`, as seen from the global environment
    ///
    /// Evaluated with `R_tryEvalSilent`, so an error (say, an unbound name)
    /// comes back as `None` instead of unwinding into the caller.
    pub fn variable(&self, name: &str) -> Option<OptionValue> {
        let c_name = CString::new(name).ok()?;
        let s = &self.symbols;
        let mut failed: c_int = 0;
        let decoded = unsafe {
            let symbol = (s.install)(c_name.as_ptr());
            let value = (s.try_eval_silent)(symbol, *s.global_env, &mut failed);
            if failed != 0 {
                tracing::debug!(name, "evaluating variable failed");
                return None;
            }
            self.decode(name, value)
        };
        tracing::trace!(name, ?decoded, "read variable");
        decoded
    }

    /// First element of a scalar-ish R value
    ///
    /// Does not allocate, so `value` needs no protection here.
    unsafe fn decode(&self, name: &str, value: Sexp) -> Option<OptionValue> {
        let s = &self.symbols;
        unsafe {
            if value.is_null() || value == *s.nil_value || (s.length)(value) < 1 {
                return None;
            }

            match (s.type_of)(value) {
                sexptype::STRSXP => {
                    let element = (s.string_elt)(value, 0);
                    let chars = (s.r_char)(element);
                    if chars.is_null() {
                        None
                    } else {
                        let text = CStr::from_ptr(chars).to_string_lossy().into_owned();
                        Some(OptionValue::Text(text))
                    }
                }
                sexptype::LGLSXP => match read_integer(value, self.int_offset) {
                    NA_INTEGER => None,
                    flag => Some(OptionValue::Logical(flag != 0)),
                },
                sexptype::INTSXP => match read_integer(value, self.int_offset) {
                    NA_INTEGER => None,
                    number => Some(OptionValue::Integer(number)),
                },
                sexptype::REALSXP => {
                    let number = *(s.real)(value);
                    (!number.is_nan()).then_some(OptionValue::Real(number))
                }
                other => {
                    tracing::debug!(name, sexptype = other, "value has unsupported type");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_conversions() {
        assert_eq!(OptionValue::Logical(true).as_bool(), Some(true));
        assert_eq!(OptionValue::Integer(0).as_bool(), Some(false));
        assert_eq!(OptionValue::Real(1.0).as_bool(), Some(true));
        assert_eq!(OptionValue::Text("FALSE".into()).as_bool(), Some(false));
        assert_eq!(OptionValue::Text("maybe".into()).as_bool(), None);
    }

    #[test]
    fn test_text_access() {
        assert_eq!(OptionValue::Text("vi".into()).as_str(), Some("vi"));
        assert_eq!(OptionValue::Integer(3).as_str(), None);
    }

    #[test]
    fn test_read_integer_at_offset() {
        // Mimic a header followed by the payload.
        #[repr(C)]
        struct Fake {
            header: [u64; 5],
            payload: i32,
        }
        let mut fake = Fake {
            header: [0; 5],
            payload: 1234,
        };
        let offset = std::mem::offset_of!(Fake, payload) as isize;
        let sexp = Sexp((&mut fake as *mut Fake).cast());
        assert_eq!(unsafe { read_integer(sexp, offset) }, 1234);
    }
}
