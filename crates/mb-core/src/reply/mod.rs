//! Reply rendering: fragment classification, carousel building and the
//! timed reply scheduler

pub mod carousel;
pub mod fragment;
pub mod schedule;
pub mod transport;

pub use carousel::{CarouselBuilder, CarouselElement, TemplateButton};
pub use fragment::{classify, CardButton, CardFragment, FragmentKind, ReplyFragment};
pub use schedule::{plan, Dispatch, DispatchUnit, ReplyScheduler, DEFAULT_INTERVAL};
pub use transport::{MessageTransport, QuickReply, SenderAction};
