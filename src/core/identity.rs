//! Participant identity: who is in a conversation, which of them is the
//! operator, and what to call each of them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::alias::AliasMap;
use crate::core::conversation::Conversation;

/// One address taking part in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Normalized address.
    pub address: String,
    /// Alias, or the raw address when unmapped.
    pub display_name: String,
    /// `true` for the operator's own address.
    pub is_operator: bool,
}

/// Non-fatal irregularities of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum ConversationFlag {
    /// More than two distinct addresses; rendered best effort.
    TooManyParticipants(usize),
    /// No operator known, or the operator does not take part.
    OperatorUnresolved,
}

impl fmt::Display for ConversationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationFlag::TooManyParticipants(n) => write!(f, "{n} participants"),
            ConversationFlag::OperatorUnresolved => write!(f, "operator unresolved"),
        }
    }
}

/// Outcome of the operator heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorInference {
    /// Most frequent sender across conversations, if any.
    pub candidate: Option<String>,
    /// Whether the candidate holds a strict majority and a strict lead.
    pub confident: bool,
    /// Conversations the candidate sent in.
    pub support: usize,
    /// Conversations examined.
    pub total: usize,
}

impl OperatorInference {
    /// The candidate, only when the inference is confident.
    pub fn resolved(&self) -> Option<&str> {
        if self.confident {
            self.candidate.as_deref()
        } else {
            None
        }
    }
}

/// Guesses the operator as the address that sends in most conversations.
///
/// Confident only when that address sends in a strict majority of the
/// conversations and strictly more of them than the runner-up.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gchatlog::{ChatMessage, MessageStyle, group_conversations, infer_operator};
///
/// let t = Utc.with_ymd_and_hms(2014, 2, 1, 10, 0, 0).unwrap();
/// let msgs = vec![
///     ChatMessage::new("1", "me@x", t, MessageStyle::New, 0, "hi"),
///     ChatMessage::new("2", "me@x", t, MessageStyle::New, 1, "hey"),
///     ChatMessage::new("2", "bob@x", t, MessageStyle::New, 2, "yo"),
/// ];
///
/// let guess = infer_operator(&group_conversations(msgs));
/// assert_eq!(guess.resolved(), Some("me@x"));
/// ```
pub fn infer_operator(conversations: &[Conversation]) -> OperatorInference {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for conversation in conversations {
        let senders: BTreeSet<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.message.sender.as_str())
            .collect();
        for sender in senders {
            *counts.entry(sender).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // highest count first, ties by address for determinism
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total = conversations.len();
    let (candidate, support) = ranked
        .first()
        .map_or((None, 0), |(addr, n)| (Some((*addr).to_string()), *n));
    let runner_up = ranked.get(1).map_or(0, |(_, n)| *n);
    let confident = candidate.is_some() && support * 2 > total && support > runner_up;

    OperatorInference {
        candidate,
        confident,
        support,
        total,
    }
}

/// A conversation with its identities worked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConversation {
    /// The ordered conversation.
    pub conversation: Conversation,
    /// Distinct addresses in order of first appearance.
    pub participants: Vec<Participant>,
    /// Operator address used for this run, if any.
    pub operator: Option<String>,
    /// Irregularities found while resolving.
    pub flags: Vec<ConversationFlag>,
}

impl ResolvedConversation {
    /// Thread identifier.
    pub fn thread_id(&self) -> &str {
        self.conversation.thread_id()
    }

    /// Participant entry for an address.
    pub fn participant(&self, address: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.address == address)
    }

    /// Display name for an address in this conversation.
    pub fn display_name<'a>(&'a self, address: &'a str) -> &'a str {
        self.participant(address)
            .map_or(address, |p| p.display_name.as_str())
    }

    /// The other side of the conversation.
    ///
    /// First non-operator participant; with no operator in the conversation,
    /// the sender of the first message.
    pub fn counterpart(&self) -> &Participant {
        let operator_present = self.participants.iter().any(|p| p.is_operator);
        if operator_present {
            if let Some(other) = self.participants.iter().find(|p| !p.is_operator) {
                return other;
            }
        } else {
            let first_sender = &self.conversation.first().message.sender;
            if let Some(p) = self.participant(first_sender) {
                return p;
            }
        }
        // participants is never empty: every message has a sender
        &self.participants[0]
    }

    /// Returns `true` if any flag was raised.
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// Resolves identities for every conversation of a run.
#[derive(Debug, Clone)]
pub struct IdentityResolver<'a> {
    aliases: &'a AliasMap,
    operator: Option<String>,
    inference: Option<OperatorInference>,
}

impl<'a> IdentityResolver<'a> {
    /// Decides the operator: the alias file's `operator_self` if set,
    /// otherwise a confident [`infer_operator`] result.
    pub fn new(aliases: &'a AliasMap, conversations: &[Conversation]) -> Self {
        if let Some(op) = aliases.operator_self() {
            debug!(operator = op, "operator taken from alias map");
            return Self {
                aliases,
                operator: Some(op.to_string()),
                inference: None,
            };
        }

        let inference = infer_operator(conversations);
        match inference.resolved() {
            Some(op) => debug!(
                operator = op,
                support = inference.support,
                total = inference.total,
                "operator inferred"
            ),
            None if !conversations.is_empty() => warn!(
                candidate = inference.candidate.as_deref().unwrap_or("-"),
                "no confident operator; set operator_self in the alias map"
            ),
            None => {}
        }
        Self {
            aliases,
            operator: inference.resolved().map(str::to_string),
            inference: Some(inference),
        }
    }

    /// Uses a fixed operator (or none) without inference.
    pub fn with_operator(aliases: &'a AliasMap, operator: Option<&str>) -> Self {
        Self {
            aliases,
            operator: operator.map(str::to_string),
            inference: None,
        }
    }

    /// Operator address in effect.
    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    /// The heuristic's result, when inference was needed.
    pub fn inference(&self) -> Option<&OperatorInference> {
        self.inference.as_ref()
    }

    /// Resolves one conversation. Never fails; problems become flags.
    pub fn resolve(&self, conversation: Conversation) -> ResolvedConversation {
        let mut seen = BTreeSet::new();
        let mut participants = Vec::new();

        for ordered in conversation.messages() {
            let msg = &ordered.message;
            let addresses = std::iter::once(msg.sender.as_str()).chain(msg.recipient.as_deref());
            for address in addresses {
                if seen.insert(address.to_string()) {
                    participants.push(Participant {
                        address: address.to_string(),
                        display_name: self.aliases.display_name(address).to_string(),
                        is_operator: self.operator.as_deref() == Some(address),
                    });
                }
            }
        }

        let mut flags = Vec::new();
        if participants.len() > 2 {
            flags.push(ConversationFlag::TooManyParticipants(participants.len()));
        }
        if !participants.iter().any(|p| p.is_operator) {
            flags.push(ConversationFlag::OperatorUnresolved);
        }
        if !flags.is_empty() {
            debug!(thread = conversation.thread_id(), ?flags, "conversation flagged");
        }

        ResolvedConversation {
            conversation,
            participants,
            operator: self.operator.clone(),
            flags,
        }
    }

    /// Resolves a batch of conversations.
    pub fn resolve_all(&self, conversations: Vec<Conversation>) -> Vec<ResolvedConversation> {
        conversations.into_iter().map(|c| self.resolve(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::group_conversations;
    use crate::message::{ChatMessage, MessageStyle};
    use chrono::{TimeZone, Utc};

    fn msg(thread: &str, from: &str, to: &str, hint: u64) -> ChatMessage {
        let ts = Utc.timestamp_opt(1_000 + hint as i64, 0).unwrap();
        ChatMessage::new(thread, from, ts, MessageStyle::New, hint, "x").with_recipient(to)
    }

    fn archive() -> Vec<Conversation> {
        group_conversations(vec![
            msg("1", "me@x", "alice@x", 0),
            msg("1", "alice@x", "me@x", 1),
            msg("2", "bob@x", "me@x", 2),
            msg("2", "me@x", "bob@x", 3),
            msg("3", "carol@x", "me@x", 4),
            msg("3", "me@x", "carol@x", 5),
        ])
    }

    #[test]
    fn test_infer_operator_majority() {
        let inference = infer_operator(&archive());
        assert!(inference.confident);
        assert_eq!(inference.resolved(), Some("me@x"));
        assert_eq!(inference.support, 3);
        assert_eq!(inference.total, 3);
    }

    #[test]
    fn test_infer_operator_tie_is_not_confident() {
        let convs = group_conversations(vec![msg("1", "me@x", "a@x", 0), msg("1", "a@x", "me@x", 1)]);
        let inference = infer_operator(&convs);
        assert!(!inference.confident);
        assert!(inference.candidate.is_some());
        assert!(inference.resolved().is_none());
    }

    #[test]
    fn test_infer_operator_empty() {
        let inference = infer_operator(&[]);
        assert!(inference.candidate.is_none());
        assert!(!inference.confident);
    }

    #[test]
    fn test_alias_operator_wins() {
        let aliases = AliasMap::new().with_operator("alice@x");
        let convs = archive();
        let resolver = IdentityResolver::new(&aliases, &convs);
        assert_eq!(resolver.operator(), Some("alice@x"));
        assert!(resolver.inference().is_none());
    }

    #[test]
    fn test_resolve_two_party() {
        let aliases = AliasMap::new().with_alias("alice@x", "Alice");
        let convs = archive();
        let resolver = IdentityResolver::new(&aliases, &convs);
        let resolved = resolver.resolve_all(convs);

        let first = &resolved[0];
        assert!(first.flags.is_empty());
        assert_eq!(first.participants.len(), 2);
        assert_eq!(first.counterpart().display_name, "Alice");
        assert!(first.participant("me@x").unwrap().is_operator);
        assert_eq!(resolved[1].counterpart().display_name, "bob@x");
    }

    #[test]
    fn test_too_many_participants_flagged() {
        let aliases = AliasMap::new().with_operator("me@x");
        let convs = group_conversations(vec![
            msg("9", "me@x", "a@x", 0),
            msg("9", "b@x", "me@x", 1),
        ]);
        let resolved = IdentityResolver::new(&aliases, &convs).resolve_all(convs);
        assert_eq!(resolved[0].flags, vec![ConversationFlag::TooManyParticipants(3)]);
        assert_eq!(resolved[0].counterpart().address, "a@x");
    }

    #[test]
    fn test_unresolved_operator_uses_first_sender() {
        let aliases = AliasMap::new();
        let convs = group_conversations(vec![msg("1", "x@x", "y@x", 0), msg("1", "y@x", "x@x", 1)]);
        let resolver = IdentityResolver::with_operator(&aliases, None);
        let resolved = resolver.resolve(convs.into_iter().next().unwrap());

        assert_eq!(resolved.flags, vec![ConversationFlag::OperatorUnresolved]);
        assert_eq!(resolved.counterpart().address, "x@x");
    }

    #[test]
    fn test_flag_serialization() {
        let json = serde_json::to_string(&ConversationFlag::TooManyParticipants(4)).unwrap();
        assert_eq!(json, r#"{"kind":"too_many_participants","count":4}"#);
    }
}
