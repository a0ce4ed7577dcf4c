// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wire-level trace correlation headers.
//!
//! An HTTP client attaches `X-Trace-Id` and, when a span is open,
//! `X-Span-Id` to outbound requests so that server-side processing can be
//! correlated with the client operation that caused it.

use serde::Serialize;

use crate::ids::{SpanId, TraceId};

/// Header carrying the trace id.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Header carrying the current span id.
pub const SPAN_ID_HEADER: &str = "X-Span-Id";

/// The header pair for one point in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceHeaders {
    #[serde(rename = "X-Trace-Id")]
    pub trace_id: TraceId,
    #[serde(rename = "X-Span-Id", skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
}

impl TraceHeaders {
    /// Header name/value pairs, trace id first.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(TRACE_ID_HEADER, self.trace_id.to_string())];
        if let Some(span_id) = self.span_id {
            pairs.push((SPAN_ID_HEADER, span_id.to_string()));
        }
        pairs
    }

    /// Parse inbound headers. Names match case-insensitively; a missing or
    /// malformed trace id gives `None`, a malformed span id is ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut trace_id = None;
        let mut span_id = None;
        for (name, value) in pairs {
            if name.eq_ignore_ascii_case(TRACE_ID_HEADER) {
                trace_id = value.parse::<TraceId>().ok();
            } else if name.eq_ignore_ascii_case(SPAN_ID_HEADER) {
                span_id = value.parse::<SpanId>().ok();
            }
        }
        trace_id.map(|trace_id| Self { trace_id, span_id })
    }

    /// Attach the headers to an outbound request.
    #[cfg(feature = "http")]
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.to_pairs()
            .into_iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }
}
