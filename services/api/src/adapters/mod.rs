pub mod attendance_fs;
pub mod canvas;
pub mod ollama_llm;
pub mod pdf;

pub use attendance_fs::FsAttendanceArchive;
pub use canvas::CanvasAdapter;
pub use ollama_llm::OllamaAdapter;
pub use pdf::PdfExtractAdapter;
