//! # Batch orchestration
//!
//! Remote queries over large tree sets are issued in fixed-size, strictly sequential batches so a
//! single request stays within the service's payload limits. Results are appended in batch order,
//! which keeps the output aligned with the input.
//!
//! With the `progress` feature, a progress bar shows the trees done and the running batch.
use log::info;

use crate::treemetrics_errors::TreeMetricsError;

/// Position of one batch in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpan {
    /// 1-based batch number.
    pub number: usize,
    /// First item (inclusive).
    pub start: usize,
    /// Last item (exclusive).
    pub end: usize,
}

impl BatchSpan {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Results of a batched run, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batched<R> {
    pub results: Vec<R>,
    pub batches: usize,
}

/// Split `0..total` into consecutive spans of at most `batch_size` items.
pub fn batch_spans(
    total: usize,
    batch_size: usize,
) -> Result<impl Iterator<Item = BatchSpan>, TreeMetricsError> {
    if batch_size == 0 {
        return Err(TreeMetricsError::InvalidParameter(
            "batch size must be >= 1".into(),
        ));
    }
    Ok((0..total)
        .step_by(batch_size)
        .enumerate()
        .map(move |(k, start)| BatchSpan {
            number: k + 1,
            start,
            end: (start + batch_size).min(total),
        }))
}

#[cfg(feature = "progress")]
fn progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} trees, {per_sec}, {msg}",
    ) {
        pb.set_style(style);
    }
    pb
}

/// Run `process` over `items`, one batch at a time.
///
/// Arguments
/// -----------------
/// * `items`: The whole input, in order.
/// * `batch_size`: Maximum number of items handed to one call.
/// * `process`: Called once per batch with its span and slice; must return exactly one result per
///   item of the slice.
///
/// Return
/// ----------
/// * Every result in input order, with the number of batches issued.
/// * The first error returned by `process`, or [`TreeMetricsError::RemoteQuery`] if a batch
///   returns the wrong number of results.
pub fn run_batched<T, R>(
    items: &[T],
    batch_size: usize,
    mut process: impl FnMut(BatchSpan, &[T]) -> Result<Vec<R>, TreeMetricsError>,
) -> Result<Batched<R>, TreeMetricsError> {
    let spans = batch_spans(items.len(), batch_size)?;

    #[cfg(feature = "progress")]
    let pb = progress_bar(items.len() as u64);
    #[cfg(feature = "progress")]
    let n_batches = items.len().div_ceil(batch_size);

    let mut results = Vec::with_capacity(items.len());
    let mut batches = 0;
    for span in spans {
        info!("Batch processing from {} to {}", span.start, span.end);
        let out = process(span, &items[span.start..span.end])?;
        if out.len() != span.len() {
            return Err(TreeMetricsError::RemoteQuery {
                attempts: 1,
                message: format!(
                    "batch {} returned {} results for {} items",
                    span.number,
                    out.len(),
                    span.len()
                ),
            });
        }
        results.extend(out);
        batches += 1;
        info!("Processed batch {}: {} trees.", span.number, span.len());

        #[cfg(feature = "progress")]
        {
            pb.set_message(format!("batch {}/{n_batches}", span.number));
            pb.inc(span.len() as u64);
        }
    }

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    Ok(Batched { results, batches })
}
