//! Reduction of a mailing's recipient states into delivered/failed counts.

use mailer_core::{DeliveryState, MailingRecord, MailingSummary};

/// Summarize one record. Pure: no I/O, same input gives same output.
///
/// Pending recipients count towards neither counter, so
/// `delivered + failed` stays below the total while messages are in flight.
pub fn summarize(record: &MailingRecord) -> MailingSummary {
    let (delivered, failed) =
        record
            .recipients
            .values()
            .fold((0u32, 0u32), |(delivered, failed), state| match state {
                DeliveryState::Delivered => (delivered + 1, failed),
                DeliveryState::Failed => (delivered, failed + 1),
                DeliveryState::Pending => (delivered, failed),
            });

    // A stored total smaller than the resolved count would break delivered + failed <= total.
    let total = record.total_recipients.map(|total| {
        if total < delivered + failed {
            tracing::warn!(
                mailing_id = %record.mailing_id,
                stored_total = total,
                resolved = delivered + failed,
                "Stored recipient total below resolved count"
            );
        }
        total.max(delivered + failed)
    });

    MailingSummary {
        timestamp: record.created_at,
        sms_text: record.text.clone(),
        mailing_id: record.mailing_id.to_string(),
        total_sms_amount: total,
        delivered_sms_amount: delivered,
        failed_sms_amount: failed,
    }
}
