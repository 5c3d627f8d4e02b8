pub mod appointment;
pub mod availability;
pub mod booking;
pub mod doctor;
pub mod intent;
pub mod session;

pub use appointment::{Appointment, AppointmentStatus, NewAppointment};
pub use availability::{AvailabilityTemplate, TimeWindow};
pub use booking::BookingRequest;
pub use doctor::{Doctor, DoctorAvailability, DoctorListing, DoctorSearch, NewDoctor};
pub use intent::{BookingCommand, Label};
pub use session::{ChatMessage, Route, RouteDecision, RouteState, Session};
