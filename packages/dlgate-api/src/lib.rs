pub mod contact;
pub mod context;
pub mod error;
pub mod routes;
pub mod server;

pub use contact::{
    CaptchaVerifier, ContactMessage, ContactRequest, HcaptchaVerifier, HttpMailer, Mailer,
    HCAPTCHA_VERIFY_URL, MAIL_API_URL,
};
pub use context::ApiContext;
pub use error::ApiError;
pub use server::ApiServer;
