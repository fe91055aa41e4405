pub mod analytics;
pub mod complaint;
mod error;
pub mod event;
pub mod notification;
pub mod sla;
pub mod taxonomy;
pub mod user;

pub use complaint::{
    Attachment, Classification, ClassificationMethod, Complaint, Feedback, Location, NewComplaint,
    Remark, Resolution, Status, TimelineEntry,
};
pub use error::DomainError;
pub use event::{ComplaintSummary, PushEvent, Room};
pub use notification::Notification;
pub use sla::{Sla, SlaPolicy, SlaStatus};
pub use taxonomy::{Category, Department, Priority};
pub use user::{Actor, NewUser, Role, User, UserView};
