use crate::{
    constants::PRIVATE_TOKEN_MAX_AGE_DAYS,
    database::{sql_param::SqlParam, statements},
    dispatch::{WriteDispatcher, WriteRequest},
    error::JobError
};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// Housekeeping deletes, in the order they must run
pub fn requests(now: DateTime<Utc>) -> Vec<WriteRequest> {
    vec![
        WriteRequest::ordered(statements::DELETE_EXPIRED_PASSWORD_RESETS, vec![]),
        WriteRequest::ordered(
            statements::DELETE_STALE_PRIVATE_TOKENS,
            vec![SqlParam::Timestamp(now - Duration::days(PRIVATE_TOKEN_MAX_AGE_DAYS))]
        ),
    ]
}

pub async fn run(dispatcher: &WriteDispatcher, now: DateTime<Utc>) -> Result<(), JobError> {
    let requests = requests(now);
    let count = requests.len();
    for request in requests {
        dispatcher.submit(request).await?;
    }

    info!(statements = count, "Maintenance queued");
    Ok(())
}
