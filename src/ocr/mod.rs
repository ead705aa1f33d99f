pub mod engine;
pub mod pool;
pub mod setup;

pub use engine::{CharSet, Recognizer, TesseractEngine};
pub use pool::{PendingRecognition, RecognizerPool};
pub use setup::{ensure_tesseract, TesseractPaths};
