pub mod digest_job;

pub use digest_job::{DigestChapter, DigestJob, DigestJobState, DigestRequest, SpeechFile};
