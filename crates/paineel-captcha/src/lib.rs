//! PAINEEL Captcha - resolves the SEI search captcha.
//!
//! A remote solving service is tried first; local OCR through tesseract is
//! the fallback. The resolver owns the attempt loop, the challenge reload
//! between attempts and the cleanup of the temporary images.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod ocr;
pub mod preprocess;
pub mod remote;
pub mod resolver;

pub use error::{CaptchaError, Result};
pub use ocr::{OcrEngine, TesseractOcr};
pub use remote::{RemoteSolver, TwoCaptchaClient};
pub use resolver::{CaptchaResolver, ResolverSettings};
