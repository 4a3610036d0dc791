use pvault_derive::pvault_error;
use pvault_domain::constants::ErrorCode;
use std::borrow::Cow;

#[pvault_error]
pub enum DemoError {
    #[code(NotFound)]
    #[error("Missing{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let missing = DemoError::Missing { message: "vid".into(), context: None };
    assert_eq!(missing.code(), ErrorCode::NotFound);

    let internal: DemoError = "boom".into();
    assert_eq!(internal.code(), ErrorCode::InternalError);
}
