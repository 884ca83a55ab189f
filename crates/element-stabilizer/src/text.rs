//! Reading text out of settled element lists.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use storefront_core_types::HarnessError;
use tracing::{debug, info};

use crate::api::ElementStabilizer;
use crate::errors::{ElementWaitError, WaitCause};
use crate::model::CardinalityContract;
use crate::ports::{ElementHandle, LiveQuery};

/// Wait for `query` to settle and return the trimmed, non-empty texts in page order.
pub async fn collect_texts(
    stabilizer: &dyn ElementStabilizer,
    query: &dyn LiveQuery,
    timeout: Duration,
) -> Result<Vec<String>, ElementWaitError> {
    let contract = CardinalityContract::stable();
    let result = stabilizer.wait(query, contract, timeout).await?;
    let texts = read_texts(result.elements()).await.map_err(|err| {
        ElementWaitError::new(
            query.describe(),
            contract,
            Some(result.len()),
            WaitCause::Driver(err),
        )
    })?;

    let texts: Vec<String> = texts.into_iter().filter(|text| !text.is_empty()).collect();
    info!(elements = result.len(), texts = ?texts, "Collected element texts");
    Ok(texts)
}

/// Wait for exactly `expected` elements and for every one of them to carry text.
pub async fn wait_for_texts(
    stabilizer: &dyn ElementStabilizer,
    query: &dyn LiveQuery,
    expected: usize,
    timeout: Duration,
) -> Result<Vec<String>, ElementWaitError> {
    let clock = stabilizer.clock();
    let poll = stabilizer.policy().bound_poll_interval();
    let started = clock.now();
    let contract = CardinalityContract::exactly(expected);
    stabilizer.wait(query, contract, timeout).await?;

    let fail = |found: Option<usize>, cause: WaitCause| {
        ElementWaitError::new(query.describe(), contract, found, cause)
    };

    loop {
        let elements = query
            .all()
            .await
            .map_err(|err| fail(None, WaitCause::Driver(err)))?;
        let texts = read_texts(&elements)
            .await
            .map_err(|err| fail(Some(elements.len()), WaitCause::Driver(err)))?;
        let populated = texts.iter().filter(|text| !text.is_empty()).count();
        if elements.len() == expected && populated == expected {
            return Ok(texts);
        }

        if clock.since(started) >= timeout {
            return Err(fail(
                Some(elements.len()),
                WaitCause::TextTimeout {
                    expected,
                    populated,
                },
            ));
        }
        debug!(
            populated,
            expected,
            found = elements.len(),
            "waiting for element texts"
        );
        clock.sleep(poll).await;
    }
}

async fn read_texts(elements: &[Arc<dyn ElementHandle>]) -> Result<Vec<String>, HarnessError> {
    let texts = try_join_all(elements.iter().map(|element| element.text_content())).await?;
    Ok(texts
        .into_iter()
        .map(|text| text.map(|t| t.trim().to_string()).unwrap_or_default())
        .collect())
}
