//! Conversation commands.

use cartify_client::{Cartify, DeliveryState};
use cartify_core::ConversationId;

use super::{CommandError, require_session};

pub async fn conversations(cartify: &Cartify) -> Result<(), CommandError> {
    require_session(cartify)?;
    for conversation in cartify.api().user().conversations().await? {
        let with = conversation
            .participants
            .iter()
            .map(|p| p.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<26} {:>3} unread  {with}: {}",
            conversation.id,
            conversation.unread,
            conversation.last_message.unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn show(cartify: &Cartify, conversation: &str) -> Result<(), CommandError> {
    require_session(cartify)?;
    let me = cartify.auth().current_user().map(|u| u.id);
    let messages = cartify
        .api()
        .user()
        .messages(&ConversationId::new(conversation))
        .await?;
    for message in messages {
        let who = if me.as_ref() == Some(&message.sender) {
            "me".to_string()
        } else {
            message.sender.to_string()
        };
        println!("[{who}] {}", message.text);
    }
    Ok(())
}

/// Send a message, echoing it immediately and then its delivery state.
pub async fn send(cartify: &Cartify, conversation: &str, text: &str) -> Result<(), CommandError> {
    require_session(cartify)?;
    let sent = cartify
        .send_message(&ConversationId::new(conversation), text, |pending| {
            println!("[me] {} (sending)", pending.text);
        })
        .await?;
    match sent.state {
        DeliveryState::Sent(id) => println!("Delivered ({id})"),
        DeliveryState::Failed(reason) => println!("Not delivered: {reason}"),
        DeliveryState::Pending => {}
    }
    Ok(())
}
