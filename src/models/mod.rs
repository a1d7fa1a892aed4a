pub mod booking;
pub mod consultant;
pub mod contact;
pub mod content;
pub mod user;
pub mod wizard;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use consultant::{ConsultantSettings, WorkingHours};
pub use contact::ContactMessage;
pub use content::{slugify, BlogPost, Client, Project, ProjectCategory};
pub use user::{User, UserRole};
pub use wizard::{is_plausible_email, BookingContact, BookingWizard, ContactPatch, WizardError, WizardStep};
