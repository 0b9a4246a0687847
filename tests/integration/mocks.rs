//! Recording adapters shared by the integration flows.

use hydrocycle::app::events::AppEvent;
use hydrocycle::app::ports::{EventSink, FeedbackPort, NotifierPort, Tone};
use hydrocycle::notify::Notification;

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(*e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingTones {
    pub played: Vec<Tone>,
}

impl FeedbackPort for RecordingTones {
    fn play(&mut self, tone: Tone) {
        self.played.push(tone);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub posted: Vec<Notification>,
}

impl RecordingNotifier {
    pub fn ids(&self) -> Vec<u32> {
        self.posted.iter().map(|n| n.id).collect()
    }
}

impl NotifierPort for RecordingNotifier {
    fn notify(&mut self, notification: &Notification) {
        self.posted.push(notification.clone());
    }
}
