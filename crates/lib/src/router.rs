//! Inbound message router: pick exactly one reply strategy per text-message
//! event and send the reply through the LINE client.
//!
//! Strategy priority (first match wins):
//! 1. escalation keywords (any time of day),
//! 2. working window on a working day => human handoff acknowledgement,
//! 3. otherwise one OpenAI completion with the fixed persona prompt.

use crate::channels::{LineError, ReplySender, WebhookEvent};
use crate::config::RoutingConfig;
use crate::llm::{Completer, OpenAiError, SamplingConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use std::sync::Arc;

/// Persona and reference size table for the completion fallback. The user's
/// message is the only conversational turn on top of this.
pub const SYSTEM_PROMPT: &str = "\
You are the Ascenda Lift Thailand virtual assistant.
Promote Ascenda residential lifts only, never mention competitors.
Reply in Thai if user types Thai; reply in English otherwise.

SIZE TABLE (mm):
S  700x600  hatch 818x1056 | gate 930x1132
M  700x800  hatch 818x1256 | gate 930x1332
L  700x1000 hatch 818x1456 | gate 930x1532
XL 850x1250 hatch 1302x1382 | gate 1375x1496
";

/// First escalation message: installation details depend on the site, a
/// technician will follow up within one working day.
pub const ESCALATION_FOLLOW_UP: &str =
    "รายละเอียดการติดตั้งขึ้นอยู่กับพื้นที่จริง ทีมช่างจะติดต่อกลับภายใน 1 วันทำการค่ะ";

/// Second escalation message: ask for name and phone number for the callback.
pub const ESCALATION_CONTACT_REQUEST: &str =
    "กรุณาพิมพ์ชื่อและเบอร์โทรไว้เพื่อให้เราติดต่อกลับได้เร็วที่สุด 🙏";

/// Business-hours acknowledgement: staff will reply directly shortly.
pub const BUSINESS_HOURS_REPLY: &str =
    "ตอนนี้เป็นเวลาทำการ พนักงาน Ascenda จะตอบกลับคุณโดยตรงในไม่ช้า ขอบคุณค่ะ";

/// The three reply strategies. Exactly one is chosen per actionable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStrategy {
    /// Installation/sizing inquiry: fixed bilingual escalation pair, any time of day.
    Escalate,
    /// Working window on a working day: a human agent will answer directly.
    BusinessHoursHandoff,
    /// Outside the working window: answer with one OpenAI completion.
    ModelFallback,
}

/// Wall-clock source at the deployment's fixed UTC offset. Injectable so
/// strategy selection stays pure and testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the system clock at a fixed UTC offset (Bangkok +07:00 by default;
/// no DST there, so an offset is enough).
pub struct LocalClock {
    offset: FixedOffset,
}

impl LocalClock {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .with_context(|| format!("invalid UTC offset: {} hours", utc_offset_hours))?;
        Ok(Self { offset })
    }
}

impl Clock for LocalClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Compiled routing rules: lowercased keyword set and the working window.
#[derive(Debug, Clone)]
pub struct RouterRules {
    keywords: Vec<String>,
    open_hour: u32,
    close_hour: u32,
    rest_day: Weekday,
}

impl RouterRules {
    /// Compile rules from config. Fails on an unrecognized rest-day name.
    pub fn from_config(config: &RoutingConfig) -> Result<Self> {
        let rest_day: Weekday = config
            .rest_day
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid routing.restDay: {}", config.rest_day))?;
        Ok(Self {
            keywords: config
                .escalation_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            open_hour: config.open_hour,
            close_hour: config.close_hour,
            rest_day,
        })
    }

    fn matches_keyword(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    fn in_working_window(&self, now: DateTime<FixedOffset>) -> bool {
        now.weekday() != self.rest_day
            && now.hour() >= self.open_hour
            && now.hour() < self.close_hour
    }
}

/// Pure strategy selection: deterministic and total for a given text and instant.
pub fn choose_strategy(
    text: &str,
    now: DateTime<FixedOffset>,
    rules: &RouterRules,
) -> ReplyStrategy {
    if rules.matches_keyword(text) {
        return ReplyStrategy::Escalate;
    }
    if rules.in_working_window(now) {
        return ReplyStrategy::BusinessHoursHandoff;
    }
    ReplyStrategy::ModelFallback
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Reply(#[from] LineError),
    #[error(transparent)]
    Completion(#[from] OpenAiError),
}

/// Routes inbound events: selects a strategy and sends the reply. Stateless
/// apart from the injected clock reading per event.
pub struct Router {
    rules: RouterRules,
    model: String,
    sampling: SamplingConfig,
    sender: Arc<dyn ReplySender>,
    completer: Arc<dyn Completer>,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(
        rules: RouterRules,
        model: impl Into<String>,
        sampling: SamplingConfig,
        sender: Arc<dyn ReplySender>,
        completer: Arc<dyn Completer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rules,
            model: model.into(),
            sampling,
            sender,
            completer,
            clock,
        }
    }

    /// Handle one event: non-text and non-message events are skipped silently;
    /// actionable events get exactly one reply call (two messages for the
    /// escalation pair, one otherwise). Completion failures propagate — there
    /// is no local retry or fallback text.
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<(), RouterError> {
        let Some(text) = event.text() else {
            log::debug!("skipping non-text event: {}", event.typ);
            return Ok(());
        };
        let Some(reply_token) = event.reply_token.as_deref() else {
            log::debug!("text event without reply token, skipping");
            return Ok(());
        };
        let text = text.trim();
        let strategy = choose_strategy(text, self.clock.now(), &self.rules);
        log::info!("routing text event via {:?}", strategy);
        match strategy {
            ReplyStrategy::Escalate => {
                self.sender
                    .reply(
                        reply_token,
                        &[
                            ESCALATION_FOLLOW_UP.to_string(),
                            ESCALATION_CONTACT_REQUEST.to_string(),
                        ],
                    )
                    .await?;
            }
            ReplyStrategy::BusinessHoursHandoff => {
                self.sender
                    .reply(reply_token, &[BUSINESS_HOURS_REPLY.to_string()])
                    .await?;
            }
            ReplyStrategy::ModelFallback => {
                let answer = self
                    .completer
                    .complete(&self.model, SYSTEM_PROMPT, text, self.sampling)
                    .await?;
                self.sender.reply(reply_token, &[answer]).await?;
            }
        }
        Ok(())
    }
}
