pub mod cancel;
pub mod event;
pub mod executor;
pub mod progress;
pub mod resume;
pub mod step;

mod error;
mod steps;

pub use self::{
	cancel::CancelFlags,
	error::{Error, Result},
	event::{EndReason, JobCounters, JobEvent},
	executor::JobRunner,
	progress::{Delivery, ProgressBus, Subscription},
	resume::{PdfBuffer, PdfInfo, ResumePayload, ScrapedPdf},
	step::Step,
};
