pub mod attendance;
pub mod catalog;
pub mod chat;
pub mod chunking;
pub mod documents;
pub mod domain;
pub mod ports;

pub use domain::{
    AttendanceRecord, AttendanceStatus, ChatRole, ChatTurn, Course, CourseListing, CourseTerm,
    DocumentOrigin, DocumentText, Quiz, QuizSubmission, Student,
};
pub use ports::{
    AttendanceArchive, Completion, CompletionRequest, DocumentTextExtractor, LanguageModelService,
    LmsService, PortError, PortResult,
};
