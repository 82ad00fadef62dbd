//! HSSE assistant: a few canned lookups answered from the record store, the
//! rest forwarded to the hosted chat endpoint with the conversation so far.

use crate::core::{ChatClient, RecordStore};
use crate::domain::model::{Filter, Record, SelectQuery, Table};
use crate::domain::ports::{ChatMessage, ChatRequest, ChatRole};
use crate::utils::error::{HsseError, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};

pub const GREETING: &str = "Mauri! I am your HSSE Assistant. You can ask about incidents, near misses, audits, training, or ask me to help draft emails and reports.";
pub const CLEARED: &str = "I have cleared our previous conversation. How can I assist you with HSSE now?";
pub const DEFAULT_CONTEXT: &str = "You are an HSSE assistant. You help with incidents, near misses, audits, training, emails, and reports. Keep answers concise and practical.";

const OPEN_STATUSES: &[&str] = &["open", "investigating", "in_progress", "scheduled"];
const LIST_LIMIT: usize = 5;
const TRAINING_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAction {
    OpenItems,
    MonthlySnapshot,
    ExpiringTraining,
}

impl LocalAction {
    /// Matches a message against the canned lookups.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        if lower.contains("open incidents") || lower.starts_with("/open-incidents") {
            Some(LocalAction::OpenItems)
        } else if lower.contains("this month") && (lower.contains("hsse performance") || lower.contains("summary")) {
            Some(LocalAction::MonthlySnapshot)
        } else if lower.contains("training") && (lower.contains("expiring soon") || lower.contains("expire soon")) {
            Some(LocalAction::ExpiringTraining)
        } else {
            None
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            LocalAction::OpenItems => {
                "I tried to load open incidents and near misses but something went wrong. Please check the logs or the incidents and inspections tables."
            }
            LocalAction::MonthlySnapshot => {
                "I could not load this month's HSSE numbers. Please check the logs or the created_at columns."
            }
            LocalAction::ExpiringTraining => {
                "I tried to look up training that will expire soon but something failed. Please confirm the training_records table and its expiry_date column."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Answered from the record store.
    Action,
    /// Answered by the chat endpoint.
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
    pub kind: ReplyKind,
}

fn near_miss_filter() -> Filter {
    Filter::ILike("reporting_type".to_string(), "nearmiss".to_string())
}

fn open_filter() -> Filter {
    Filter::In(
        "status".to_string(),
        OPEN_STATUSES.iter().map(|s| s.to_string()).collect(),
    )
}

fn item_lines(rows: &[Record], limit: usize) -> String {
    let mut lines: Vec<String> = rows
        .iter()
        .take(limit)
        .map(|r| {
            format!(
                "- #{}: {} ({})",
                r.id().unwrap_or_default(),
                r.str_field("title").unwrap_or("No title"),
                r.str_field("status").unwrap_or("status?")
            )
        })
        .collect();
    if rows.len() > limit {
        lines.push(format!("...and {} more.", rows.len() - limit));
    }
    lines.join("\n")
}

pub fn open_items_summary(incidents: &[Record], near_misses: &[Record]) -> String {
    let mut summary = String::from("Here is a quick summary of open items:\n\n");
    summary.push_str(&format!("• Open / in-progress incidents: {}\n", incidents.len()));
    summary.push_str(&format!("• Open / in-progress near misses: {}\n", near_misses.len()));

    if !incidents.is_empty() {
        summary.push_str("\nIncidents:\n");
        summary.push_str(&item_lines(incidents, LIST_LIMIT));
    }
    if !near_misses.is_empty() {
        summary.push_str("\n\nNear Misses:\n");
        summary.push_str(&item_lines(near_misses, LIST_LIMIT));
    }
    summary
}

fn non_empty(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(HsseError::ProcessingError {
            message: "Message is empty".to_string(),
        });
    }
    Ok(text)
}

/// Sends one message to the chat endpoint with no history and no local lookups.
pub async fn ask_once<C: ChatClient>(chat: &C, text: &str) -> Result<String> {
    let request = ChatRequest::Single {
        message: non_empty(text)?.to_string(),
    };
    chat.send(&request).await
}

pub fn monthly_summary(incidents: usize, near_misses: usize, audits: usize) -> String {
    [
        "Here is a quick HSSE performance snapshot for this month:".to_string(),
        String::new(),
        format!("• Incidents recorded: {}", incidents),
        format!("• Near misses recorded: {}", near_misses),
        format!("• Audits conducted: {}", audits),
        String::new(),
        "You can ask me to help write a short HSSE summary report for the Board or Management.".to_string(),
    ]
    .join("\n")
}

pub fn expiring_training_summary(training: &[Record]) -> String {
    let mut summary = format!("Training records expiring in the next 30 days: {}.", training.len());
    if !training.is_empty() {
        summary.push_str(&format!("\n\nDetails (showing up to {}):\n", TRAINING_LIST_LIMIT));
        let lines: Vec<String> = training
            .iter()
            .take(TRAINING_LIST_LIMIT)
            .map(|t| {
                let mut line = format!("- {}", t.str_field("training_name").unwrap_or("Course"));
                if let Some(cert) = t.str_field("certificate_number").filter(|c| !c.is_empty()) {
                    line.push_str(&format!(" [{}]", cert));
                }
                line.push_str(&format!(" (expires {})", t.str_field("expiry_date").unwrap_or("no date")));
                line
            })
            .collect();
        summary.push_str(&lines.join("\n"));
    }
    summary
}

pub struct Assistant<R: RecordStore, C: ChatClient> {
    store: R,
    chat: C,
    context: String,
    history: Vec<ChatMessage>,
    today: Option<NaiveDate>,
}

impl<R: RecordStore, C: ChatClient> Assistant<R, C> {
    pub fn new(store: R, chat: C, context: impl Into<String>) -> Self {
        Self {
            store,
            chat,
            context: context.into(),
            history: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: GREETING.to_string(),
            }],
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history = vec![ChatMessage {
            role: ChatRole::Assistant,
            content: CLEARED.to_string(),
        }];
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Answers one user message. Store failures during a canned lookup turn
    /// into an apology reply; chat endpoint failures are returned as errors
    /// and leave the history untouched.
    pub async fn ask(&mut self, text: &str) -> Result<AssistantReply> {
        let text = non_empty(text)?;
        let user = ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        };

        let reply = match LocalAction::detect(text) {
            Some(action) => {
                tracing::info!("🔍 Answering locally with {:?}", action);
                let content = self.run_local(action).await.unwrap_or_else(|e| {
                    tracing::error!("❌ Local action {:?} failed: {}", action, e);
                    action.failure_message().to_string()
                });
                AssistantReply {
                    content,
                    kind: ReplyKind::Action,
                }
            }
            None => {
                let request = ChatRequest::Conversation {
                    messages: self.history.iter().cloned().chain(std::iter::once(user.clone())).collect(),
                    context: self.context.clone(),
                };
                let content = self.chat.send(&request).await.inspect_err(|e| {
                    tracing::error!("❌ Chat request failed: {}", e);
                })?;
                AssistantReply {
                    content,
                    kind: ReplyKind::Ai,
                }
            }
        };

        self.history.push(user);
        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply.content.clone(),
        });
        Ok(reply)
    }

    async fn run_local(&self, action: LocalAction) -> Result<String> {
        match action {
            LocalAction::OpenItems => {
                let columns = "id,title,status";
                let incidents = SelectQuery::all().columns(columns).filter(open_filter());
                let near_misses = SelectQuery::all()
                    .columns(columns)
                    .filter(near_miss_filter())
                    .filter(open_filter());
                let (incidents, near_misses) = tokio::try_join!(
                    self.store.select(Table::Incidents, &incidents),
                    self.store.select(Table::Inspections, &near_misses),
                )?;
                Ok(open_items_summary(&incidents, &near_misses))
            }
            LocalAction::MonthlySnapshot => {
                let today = self.today();
                let month_start = today.with_day(1).unwrap_or(today).to_string();
                let since = || Filter::Gte("created_at".to_string(), month_start.clone());
                let incidents = SelectQuery::all().columns("id").filter(since());
                let near_misses = SelectQuery::all().columns("id").filter(near_miss_filter()).filter(since());
                let audits = SelectQuery::all()
                    .columns("id")
                    .filter(Filter::ILike("inspection_type".to_string(), "audit".to_string()))
                    .filter(since());
                let (incidents, near_misses, audits) = tokio::try_join!(
                    self.store.select(Table::Incidents, &incidents),
                    self.store.select(Table::Inspections, &near_misses),
                    self.store.select(Table::Inspections, &audits),
                )?;
                Ok(monthly_summary(incidents.len(), near_misses.len(), audits.len()))
            }
            LocalAction::ExpiringTraining => {
                let today = self.today();
                let query = SelectQuery::all()
                    .columns("id,training_name,certificate_number,expiry_date")
                    .filter(Filter::Gte("expiry_date".to_string(), today.to_string()))
                    .filter(Filter::Lte(
                        "expiry_date".to_string(),
                        (today + Duration::days(crate::core::dashboard::EXPIRY_WINDOW_DAYS)).to_string(),
                    ))
                    .order_by("expiry_date", true);
                let training = self.store.select(Table::TrainingRecords, &query).await?;
                Ok(expiring_training_summary(&training))
            }
        }
    }
}
