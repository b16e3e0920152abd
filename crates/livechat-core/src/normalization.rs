use crate::{
    error::LiveError,
    types::{AppState, ConversationKey, IncomingMessage},
};

/// Push notification classified by the state the app received it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRoute {
    /// Received while the app is in the foreground.
    Foreground(IncomingMessage),
    /// The user opened the app from the notification.
    Launch(ConversationKey),
    /// Nothing to apply.
    Ignore,
}

/// Parse the thread identity carried by a push payload.
///
/// Accepted shapes:
/// - `"<peer>"`: one-to-one thread
/// - `"<peer>:<conversation id>"`: one-to-one thread with conversation proxy
/// - `"<a>:<group id>:<b>..."`: group thread (second component)
pub fn parse_push_payload(payload: &str) -> Result<ConversationKey, LiveError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(LiveError::malformed("push payload is empty"));
    }

    let components: Vec<&str> = payload.split(':').collect();
    match components.as_slice() {
        [peer] => Ok(ConversationKey::peer(*peer)),
        [peer, conversation] => {
            let conversation_id = parse_id(conversation, "conversation")?;
            if peer.is_empty() {
                return Ok(ConversationKey::default().with_conversation(conversation_id));
            }
            Ok(ConversationKey::peer(*peer).with_conversation(conversation_id))
        }
        [_, group, ..] => Ok(ConversationKey::group(parse_id(group, "group")?)),
        [] => Err(LiveError::malformed("push payload is empty")),
    }
}

/// Message body from a push alert of the form `"<sender>:<body>"`.
pub fn parse_alert_body(alert: &str) -> String {
    match alert.split_once(':') {
        Some((_, body)) => body.split(':').next().unwrap_or(body).to_owned(),
        None => alert.to_owned(),
    }
}

/// Classify a parsed push by app state.
pub fn route_push(key: ConversationKey, alert: Option<&str>, app_state: AppState) -> PushRoute {
    match app_state {
        AppState::Active => match alert {
            Some(alert) => PushRoute::Foreground(IncomingMessage {
                key,
                body: Some(parse_alert_body(alert)),
                sent_by_self: false,
                message_key: None,
            }),
            None => PushRoute::Ignore,
        },
        AppState::Inactive if key.is_addressable() => PushRoute::Launch(key),
        AppState::Inactive | AppState::Background => PushRoute::Ignore,
    }
}

/// Parse and classify in one step.
pub fn normalize_push(
    payload: &str,
    alert: Option<&str>,
    app_state: AppState,
) -> Result<PushRoute, LiveError> {
    let key = parse_push_payload(payload)?;
    Ok(route_push(key, alert, app_state))
}

fn parse_id(value: &str, field: &str) -> Result<i64, LiveError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|err| LiveError::malformed(format!("invalid {field} id '{value}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiveErrorCategory;

    #[test]
    fn parses_each_payload_shape() {
        assert_eq!(
            parse_push_payload("bob").expect("peer payload"),
            ConversationKey::peer("bob")
        );
        assert_eq!(
            parse_push_payload("bob:77").expect("proxy payload"),
            ConversationKey::peer("bob").with_conversation(77)
        );
        assert_eq!(
            parse_push_payload("AL_GROUP:1234:extra").expect("group payload"),
            ConversationKey::group(1234)
        );
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = parse_push_payload("bob:abc").expect_err("conversation id must be numeric");
        assert_eq!(err.category, LiveErrorCategory::MalformedEvent);

        let err = parse_push_payload("x:grp:y").expect_err("group id must be numeric");
        assert_eq!(err.code, "malformed_event");
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(parse_push_payload("  ").is_err());
    }

    #[test]
    fn alert_body_drops_sender_prefix() {
        assert_eq!(parse_alert_body("bob:see you"), "see you");
        assert_eq!(parse_alert_body("plain alert"), "plain alert");
    }

    #[test]
    fn foreground_push_becomes_list_message() {
        let route = route_push(ConversationKey::peer("bob"), Some("bob:hey"), AppState::Active);
        match route {
            PushRoute::Foreground(message) => {
                assert_eq!(message.key, ConversationKey::peer("bob"));
                assert_eq!(message.body.as_deref(), Some("hey"));
                assert!(!message.sent_by_self);
            }
            other => panic!("unexpected route: {other:?}"),
        }
    }

    #[test]
    fn inactive_push_launches_and_background_is_ignored() {
        assert_eq!(
            normalize_push("9:55:x", None, AppState::Inactive).expect("valid payload"),
            PushRoute::Launch(ConversationKey::group(55))
        );
        assert_eq!(
            normalize_push("bob", Some("bob:hi"), AppState::Background).expect("valid payload"),
            PushRoute::Ignore
        );
        assert_eq!(
            route_push(ConversationKey::peer("bob"), None, AppState::Active),
            PushRoute::Ignore
        );
    }
}
