//! Reply sequencing
//!
//! A reply burst is planned up front as a list of `(delay, unit)` pairs and
//! then handed to the tokio timer: every unit becomes its own task that
//! sleeps for its delay and sends. Consecutive cards are merged into one
//! carousel unit.
//!
//! Delays:
//! - a single fragment at index `i` waits `i * interval`
//! - a carousel waits one interval less than its last card's index,
//!   clamped at zero

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::carousel::CarouselBuilder;
use super::fragment::{CardFragment, ReplyFragment};
use super::transport::{MessageTransport, QuickReply};
use crate::recipient::RecipientId;

/// Gap between two consecutive reply messages
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1100);

/// What a unit sends when its timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Single(ReplyFragment),
    Carousel(Vec<CardFragment>),
}

/// A dispatch paired with its delay from the start of the burst
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchUnit {
    pub delay: Duration,
    pub dispatch: Dispatch,
}

/// Plan the sends for `fragments` without performing any of them.
///
/// Order is preserved; only contiguous cards are grouped. Unknown fragments
/// produce no unit but still end a card run.
pub fn plan(fragments: &[ReplyFragment], interval: Duration) -> Vec<DispatchUnit> {
    let mut units = Vec::new();
    let mut pending: Vec<CardFragment> = Vec::new();

    for (i, fragment) in fragments.iter().enumerate() {
        let is_last = i + 1 == fragments.len();

        match fragment {
            ReplyFragment::Card(card) => {
                pending.push(card.clone());
                if is_last {
                    units.push(flush(&mut pending, i, interval));
                }
            }
            ReplyFragment::Unknown => {
                if !pending.is_empty() {
                    units.push(flush(&mut pending, i - 1, interval));
                }
            }
            other => {
                if !pending.is_empty() {
                    units.push(flush(&mut pending, i - 1, interval));
                }
                units.push(DispatchUnit {
                    delay: step(interval, i),
                    dispatch: Dispatch::Single(other.clone()),
                });
            }
        }
    }

    units
}

fn flush(pending: &mut Vec<CardFragment>, last_card: usize, interval: Duration) -> DispatchUnit {
    DispatchUnit {
        delay: step(interval, last_card.saturating_sub(1)),
        dispatch: Dispatch::Carousel(std::mem::take(pending)),
    }
}

fn step(interval: Duration, index: usize) -> Duration {
    interval.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

/// Sends a planned unit through the transport
pub async fn dispatch(transport: &dyn MessageTransport, recipient: &RecipientId, dispatch: &Dispatch) {
    match dispatch {
        Dispatch::Carousel(cards) => {
            let elements = CarouselBuilder::build(cards);
            transport.send_carousel(recipient, &elements).await;
        }
        Dispatch::Single(fragment) => send_fragment(transport, recipient, fragment).await,
    }
}

async fn send_fragment(transport: &dyn MessageTransport, recipient: &RecipientId, fragment: &ReplyFragment) {
    match fragment {
        ReplyFragment::Text(lines) => {
            for line in lines.iter().filter(|line| !line.is_empty()) {
                transport.send_text(recipient, line).await;
            }
        }
        ReplyFragment::QuickReplies { title, options } => {
            let replies: Vec<QuickReply> = options.iter().map(QuickReply::echo).collect();
            transport.send_quick_replies(recipient, title, &replies).await;
        }
        ReplyFragment::Image { uri } => transport.send_image(recipient, uri).await,
        ReplyFragment::Card(card) => {
            let elements = CarouselBuilder::build(std::slice::from_ref(card));
            transport.send_carousel(recipient, &elements).await;
        }
        ReplyFragment::Unknown => {}
    }
}

/// Schedules reply bursts on a transport
#[derive(Clone)]
pub struct ReplyScheduler {
    transport: Arc<dyn MessageTransport>,
    interval: Duration,
}

impl ReplyScheduler {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            transport,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn transport(&self) -> &Arc<dyn MessageTransport> {
        &self.transport
    }

    /// Register one timer task per unit and return immediately.
    ///
    /// The returned handles only allow waiting for the burst; dropping them
    /// does not cancel anything.
    pub fn schedule(&self, recipient: &RecipientId, fragments: &[ReplyFragment]) -> Vec<JoinHandle<()>> {
        let units = plan(fragments, self.interval);
        debug!(
            recipient = %recipient,
            fragments = fragments.len(),
            units = units.len(),
            "Scheduling reply burst"
        );

        units
            .into_iter()
            .map(|unit| {
                let transport = Arc::clone(&self.transport);
                let recipient = recipient.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(unit.delay).await;
                    dispatch(transport.as_ref(), &recipient, &unit.dispatch).await;
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::carousel::TemplateButton;
    use crate::reply::fragment::CardButton;
    use crate::reply::transport::testing::{RecordingTransport, Sent};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn card(title: &str) -> ReplyFragment {
        ReplyFragment::card(title, vec![CardButton::new("Go", "GO")])
    }

    fn delays(units: &[DispatchUnit]) -> Vec<u128> {
        units.iter().map(|u| u.delay.as_millis()).collect()
    }

    fn carousel_len(unit: &DispatchUnit) -> Option<usize> {
        match &unit.dispatch {
            Dispatch::Carousel(cards) => Some(cards.len()),
            Dispatch::Single(_) => None,
        }
    }

    #[test]
    fn test_plan_without_cards() {
        let fragments = vec![
            ReplyFragment::text("a"),
            ReplyFragment::QuickReplies {
                title: "q".into(),
                options: vec!["x".into()],
            },
            ReplyFragment::Image { uri: "u".into() },
            ReplyFragment::text("b"),
        ];

        let units = plan(&fragments, DEFAULT_INTERVAL);
        assert_eq!(delays(&units), vec![0, 1100, 2200, 3300]);
        for (unit, fragment) in units.iter().zip(&fragments) {
            assert_eq!(unit.dispatch, Dispatch::Single(fragment.clone()));
        }
    }

    #[test]
    fn test_plan_only_cards() {
        for k in 2..6usize {
            let fragments: Vec<_> = (0..k).map(|i| card(&format!("c{}", i))).collect();
            let units = plan(&fragments, DEFAULT_INTERVAL);

            assert_eq!(units.len(), 1);
            assert_eq!(carousel_len(&units[0]), Some(k));
            assert_eq!(units[0].delay, ms(1100 * (k as u64 - 2)));
        }
    }

    #[test]
    fn test_plan_single_card_clamps_to_zero() {
        let units = plan(&[card("only")], DEFAULT_INTERVAL);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].delay, Duration::ZERO);
        assert_eq!(carousel_len(&units[0]), Some(1));
    }

    #[test]
    fn test_plan_cards_between_text() {
        let fragments = vec![
            ReplyFragment::text("intro"),
            card("one"),
            card("two"),
            ReplyFragment::text("outro"),
        ];

        let units = plan(&fragments, DEFAULT_INTERVAL);
        assert_eq!(delays(&units), vec![0, 1100, 3300]);
        assert_eq!(carousel_len(&units[1]), Some(2));
        assert_eq!(units[2].dispatch, Dispatch::Single(ReplyFragment::text("outro")));
    }

    #[test]
    fn test_plan_leading_card_clamps_to_zero() {
        let fragments = vec![card("one"), ReplyFragment::text("after")];

        let units = plan(&fragments, DEFAULT_INTERVAL);
        assert_eq!(delays(&units), vec![0, 1100]);
        assert_eq!(carousel_len(&units[0]), Some(1));
    }

    #[test]
    fn test_plan_separate_runs_stay_separate() {
        let fragments = vec![
            card("a"),
            card("b"),
            ReplyFragment::text("mid"),
            card("c"),
        ];

        let units = plan(&fragments, DEFAULT_INTERVAL);
        assert_eq!(units.len(), 3);
        assert_eq!(carousel_len(&units[0]), Some(2));
        assert_eq!(carousel_len(&units[1]), None);
        assert_eq!(carousel_len(&units[2]), Some(1));
        assert_eq!(delays(&units), vec![0, 2200, 2200]);
    }

    #[test]
    fn test_plan_unknown_fragment_ends_run_without_send() {
        let fragments = vec![
            ReplyFragment::text("a"),
            card("b"),
            ReplyFragment::Unknown,
            ReplyFragment::text("c"),
        ];

        let units = plan(&fragments, DEFAULT_INTERVAL);
        assert_eq!(units.len(), 3);
        assert_eq!(carousel_len(&units[1]), Some(1));
        assert_eq!(delays(&units), vec![0, 0, 3300]);
    }

    #[test]
    fn test_plan_empty() {
        assert!(plan(&[], DEFAULT_INTERVAL).is_empty());
    }

    #[test]
    fn test_plan_custom_interval() {
        let fragments = vec![ReplyFragment::text("a"), ReplyFragment::text("b")];
        assert_eq!(delays(&plan(&fragments, ms(250))), vec![0, 250]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_burst_timeline() {
        let transport = Arc::new(RecordingTransport::new());
        let scheduler = ReplyScheduler::new(transport.clone());
        let recipient = RecipientId::from("psid-1");

        let fragments = vec![
            ReplyFragment::Text(vec!["hello".into(), "".into()]),
            card("one"),
            card("two"),
            ReplyFragment::text("bye"),
        ];

        let handles = scheduler.schedule(&recipient, &fragments);
        assert_eq!(handles.len(), 3);
        assert!(transport.sent().is_empty());

        for handle in handles {
            handle.await.unwrap();
        }

        let timeline = transport.timeline();
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0], (0, Sent::Text("hello".into())));
        assert_eq!(timeline[1].0, 1100);
        match &timeline[1].1 {
            Sent::Carousel(elements) => {
                assert_eq!(elements.len(), 2);
                assert_eq!(elements[0].title, "one");
                assert_eq!(
                    elements[1].buttons,
                    vec![TemplateButton::Postback {
                        title: "Go".into(),
                        payload: "GO".into()
                    }]
                );
            }
            other => panic!("expected carousel, got {:?}", other),
        }
        assert_eq!(timeline[2], (3300, Sent::Text("bye".into())));

        assert!(transport
            .deliveries()
            .iter()
            .all(|d| d.recipient == recipient));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_quick_replies_echo_labels() {
        let transport = Arc::new(RecordingTransport::new());
        let scheduler = ReplyScheduler::new(transport.clone());

        let fragments = vec![ReplyFragment::QuickReplies {
            title: "Size?".into(),
            options: vec!["S".into(), "M".into()],
        }];

        for handle in scheduler.schedule(&RecipientId::from("u"), &fragments) {
            handle.await.unwrap();
        }

        assert_eq!(
            transport.sent(),
            vec![Sent::QuickReplies(
                "Size?".into(),
                vec![QuickReply::echo("S"), QuickReply::echo("M")]
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_empty_list_sends_nothing() {
        let transport = Arc::new(RecordingTransport::new());
        let scheduler = ReplyScheduler::new(transport.clone());

        let handles = scheduler.schedule(&RecipientId::from("u"), &[]);
        assert!(handles.is_empty());
        tokio::time::sleep(ms(5000)).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_custom_interval_span() {
        let transport = Arc::new(RecordingTransport::new());
        let scheduler = ReplyScheduler::new(transport.clone()).with_interval(ms(200));
        assert_eq!(scheduler.interval(), ms(200));

        let fragments: Vec<_> = (0..4).map(|i| ReplyFragment::text(i.to_string())).collect();
        for handle in scheduler.schedule(&RecipientId::from("u"), &fragments) {
            handle.await.unwrap();
        }

        let at: Vec<u128> = transport.timeline().iter().map(|(at, _)| *at).collect();
        assert_eq!(at, vec![0, 200, 400, 600]);
    }
}
