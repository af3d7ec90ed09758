use std::future::Future;

use super::TestResult;
use crate::record::NewChatConversation;
use crate::traits::{BlobStore, RecordStore};

pub(super) async fn run_chat_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "chat",
            "conversation_round_trips",
            conversation_round_trips(factory).await,
        ),
        TestResult::from_result(
            "chat",
            "each_insert_gets_its_own_id",
            each_insert_gets_its_own_id(factory).await,
        ),
    ]
}

async fn conversation_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = s
        .insert_chat_conversation(NewChatConversation {
            message: "Where is my pickup?".to_string(),
            response: "Your pickup is scheduled.".to_string(),
            message_type: Some("order".to_string()),
        })
        .await
        .map_err(|e| e.to_string())?;
    if rec.message != "Where is my pickup?" || rec.response != "Your pickup is scheduled." {
        return Err(format!("stored conversation differs: {:?}", rec));
    }
    if rec.message_type.as_deref() != Some("order") {
        return Err(format!("message_type lost: {:?}", rec.message_type));
    }
    if rec.created_at.is_empty() {
        return Err("created_at not set".to_string());
    }
    Ok(())
}

async fn each_insert_gets_its_own_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let row = NewChatConversation {
        message: "hi".to_string(),
        response: "hello".to_string(),
        message_type: None,
    };
    let a = s
        .insert_chat_conversation(row.clone())
        .await
        .map_err(|e| e.to_string())?;
    let b = s
        .insert_chat_conversation(row)
        .await
        .map_err(|e| e.to_string())?;
    if a.id == b.id {
        return Err(format!("duplicate id {}", a.id));
    }
    Ok(())
}
