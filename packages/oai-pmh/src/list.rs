//! Paging through list verbs with resumption tokens.
//!
//! Paging is a three-state machine. [`ListState::request_params`] says what
//! to ask for next and [`ListState::advance`] consumes a parsed page; neither
//! touches the network, so the protocol rules are testable on their own.
//! `paginate` drives the machine against a [`Transport`].

use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Result;
use crate::http::{RequestOptions, Transport};
use crate::types::{ListResponse, Verb};

/// Where a list sequence is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    /// Nothing requested yet.
    Initial,
    /// The previous page returned this token.
    Continuing(String),
    /// The last page had no token, or a page failed.
    Done,
}

impl ListState {
    /// Parameters (besides `verb`) for the next request, or `None` once done.
    ///
    /// After the first page only the resumption token is sent: OAI-PMH
    /// forbids repeating the selective harvesting arguments alongside it.
    #[must_use]
    pub fn request_params(
        &self,
        initial: &[(&'static str, String)],
    ) -> Option<Vec<(&'static str, String)>> {
        match self {
            Self::Initial => Some(initial.to_vec()),
            Self::Continuing(token) => Some(vec![("resumptionToken", token.clone())]),
            Self::Done => None,
        }
    }

    /// Consume a page: the next state plus the batch to hand to the caller.
    #[must_use]
    pub fn advance<T>(self, page: ListResponse<T>) -> (ListState, Vec<T>) {
        let next = match (self, page.resumption_token) {
            (Self::Done, _) | (_, None) => Self::Done,
            (_, Some(token)) => Self::Continuing(token),
        };
        (next, page.records)
    }
}

/// Lazily request every page of a list verb.
///
/// Each item is one page of records. An error is yielded once and ends the
/// sequence. Nothing is requested until the stream is polled, and the next
/// page is only requested after the previous one has been parsed.
pub(crate) fn paginate<T>(
    transport: Transport,
    verb: Verb,
    initial: Vec<(&'static str, String)>,
    options: RequestOptions,
    parse: fn(&str) -> Result<ListResponse<T>>,
) -> BoxStream<'static, Result<Vec<T>>>
where
    T: Send + 'static,
{
    debug_assert!(verb.is_paged(), "{verb} responses carry no resumption token");

    stream::unfold(ListState::Initial, move |state| {
        let transport = transport.clone();
        let options = options.clone();
        let params = state.request_params(&initial);

        async move {
            let params = params?;
            let page = match transport.send(verb, &params, &options).await {
                Ok(xml) => parse(&xml),
                Err(e) => Err(e),
            };

            match page {
                Ok(page) => {
                    let (next, batch) = state.advance(page);
                    tracing::debug!(
                        verb = %verb,
                        records = batch.len(),
                        has_more = matches!(next, ListState::Continuing(_)),
                        "received list page"
                    );
                    Some((Ok(batch), next))
                }
                Err(e) => {
                    tracing::debug!(verb = %verb, error = %e, "list sequence failed");
                    Some((Err(e), ListState::Done))
                }
            }
        }
    })
    .boxed()
}
