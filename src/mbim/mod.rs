//! Fixed-layout MBIM records exchanged with the `umb(4)` driver and their text codec.

mod info;
mod param;
pub mod tables;
mod text;
pub mod utf16;

pub use self::info::{
    InfoRecord, InfoReport, Labelled, UMB_FWINFO_MAXLEN, UMB_HWINFO_MAXLEN, UMB_PHONENR_MAXLEN,
    UMB_PROVIDERNAME_MAXLEN, UMB_ROAMINGTEXT_MAXLEN, render,
};
pub use self::param::{
    Assignment, FieldError, PinOperation, ParameterField, ParameterRecord, UMB_APN_MAXLEN,
    UMB_PASSWORD_MAXLEN, UMB_PIN_MAXLEN, UMB_USERNAME_MAXLEN, apply_sequence, mask,
};
pub use self::text::{Utf16Field, Utf16Text};
