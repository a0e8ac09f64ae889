//! Recipient resolution from declarative targeting rules
//!
//! The store evaluates the filtered query; this module applies the opt-out
//! exclusion uniformly across all branches, dedups by consumer, and picks a
//! channel-appropriate address set per recipient.

use itertools::Itertools;
use std::collections::HashSet;

use crate::meta_adapter::{
	Channel, MetaAdapter, PhoneCardinality, RecipientSnapshot, TargetFilter, TargetGroup,
	TargetRow,
};
use crate::prelude::*;

/// Resolve the ordered, deduplicated recipient list for a campaign
/// definition. Ordering is insertion order as returned by the store; a
/// consumer matched through several accounts appears exactly once (first
/// qualifying account wins).
pub async fn resolve(
	meta: &dyn MetaAdapter,
	tn_id: TnId,
	channel: Channel,
	target_group: TargetGroup,
	folder_ids: &[u64],
	phones_to_send: PhoneCardinality,
) -> ClResult<Vec<RecipientSnapshot>> {
	let filter = match target_group {
		TargetGroup::All => TargetFilter::All,
		TargetGroup::WithBalance => TargetFilter::WithBalance,
		TargetGroup::Overdue => TargetFilter::Overdue,
		TargetGroup::Decline => TargetFilter::Decline,
		TargetGroup::RecentUpload => TargetFilter::RecentUpload,
		TargetGroup::Folder => {
			if folder_ids.is_empty() {
				// Fail closed: an empty folder set targets nobody
				return Ok(Vec::new());
			}
			TargetFilter::Folders(folder_ids.into())
		}
	};

	// A targeting rule that cannot be evaluated rejects the whole creation;
	// nothing is persisted at this point.
	let rows = meta.list_targets(tn_id, &filter).await.map_err(|err| match err {
		Error::DbError => {
			Error::ResolutionError(format!("Targeting rule {:?} could not be evaluated", target_group))
		}
		err => err,
	})?;
	let opted_out: HashSet<u64> =
		meta.list_opt_outs(tn_id, channel).await?.into_iter().collect();

	let recipients = rows
		.into_iter()
		.filter(|row| !opted_out.contains(&row.consumer.consumer_id))
		.unique_by(|row| row.consumer.consumer_id)
		.filter_map(|row| snapshot_for(&row, channel, phones_to_send))
		.collect::<Vec<_>>();

	debug!(
		"Resolved {} recipients for tenant {} ({:?}/{:?})",
		recipients.len(),
		tn_id,
		target_group,
		channel
	);
	Ok(recipients)
}

/// Pick the channel-appropriate addresses for one targeting row. Consumers
/// with no usable address on the channel are dropped from the resolution.
fn snapshot_for(
	row: &TargetRow,
	channel: Channel,
	phones_to_send: PhoneCardinality,
) -> Option<RecipientSnapshot> {
	let addresses: Box<[Box<str>]> = match channel {
		Channel::Email => {
			let email = row.consumer.email.as_ref().filter(|e| !e.is_empty())?;
			Box::new([email.clone()])
		}
		Channel::Sms => {
			// Primary first, then additional numbers in import order
			let phones: Box<[Box<str>]> = row
				.consumer
				.phones
				.iter()
				.take(phones_to_send.limit())
				.cloned()
				.collect();
			if phones.is_empty() {
				return None;
			}
			phones
		}
	};
	Some(RecipientSnapshot {
		consumer_id: row.consumer.consumer_id,
		account_id: row.account.as_ref().map(|a| a.account_id),
		addresses,
	})
}


// vim: ts=4
