// ABOUTME: deliver_sm (same mandatory layout as submit_sm) and SMSC delivery receipt parsing
// ABOUTME: Receipts are read from the TLVs first, then from the conventional receipt text

use crate::datatypes::{MessageState, SubmitSm};

/// This operation is used by the SMSC to deliver a short message to an ESME.
/// It carries both mobile originated messages and delivery receipts.
pub type DeliverSm = SubmitSm;

/// SMSC delivery receipt carried by a deliver_sm with the receipt message type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Identifier the SMSC returned in submit_sm_resp
    pub message_id: String,
    pub state: Option<MessageState>,
    pub submitted: Option<u32>,
    pub delivered: Option<u32>,
    /// `YYMMDDhhmm`
    pub submit_date: Option<String>,
    /// `YYMMDDhhmm`
    pub done_date: Option<String>,
    pub error: Option<String>,
    /// First characters of the original message
    pub text: Option<String>,
}

impl DeliveryReceipt {
    /// Parse the conventional `id:... sub:... dlvrd:... submit date:... done
    /// date:... stat:... err:... text:...` receipt body. Returns `None` when
    /// no `id:` field is present.
    pub fn parse(body: &str) -> Option<Self> {
        let mut receipt = DeliveryReceipt::default();
        let mut found_id = false;

        let mut rest = body;
        while let Some((key, after)) = next_key(rest) {
            if key == "text" {
                receipt.text = Some(after.to_string());
                break;
            }
            let (value, remainder) = after.split_once(' ').unwrap_or((after, ""));
            rest = remainder;
            match key {
                "id" => {
                    receipt.message_id = value.to_string();
                    found_id = true;
                }
                "sub" => receipt.submitted = value.parse().ok(),
                "dlvrd" => receipt.delivered = value.parse().ok(),
                "submit date" => receipt.submit_date = Some(value.to_string()),
                "done date" => receipt.done_date = Some(value.to_string()),
                "stat" => receipt.state = MessageState::from_receipt_stat(value),
                "err" => receipt.error = Some(value.to_string()),
                _ => {}
            }
        }

        found_id.then_some(receipt)
    }
}

/// Split `key:value...` at the first colon, skipping leading blanks
fn next_key(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    let (key, value) = input.split_once(':')?;
    Some((key.trim(), value))
}

impl SubmitSm {
    /// Delivery receipt view of a deliver_sm.
    ///
    /// `receipted_message_id` and `message_state` TLVs override what the
    /// receipt text says. Returns `None` unless `esm_class` marks the message
    /// as a receipt.
    pub fn delivery_receipt(&self) -> Option<DeliveryReceipt> {
        if !self.esm_class.is_delivery_receipt() {
            return None;
        }

        let text = String::from_utf8_lossy(self.payload());
        let mut receipt = DeliveryReceipt::parse(&text).unwrap_or_default();

        if let Some(message_id) = self.optional.receipted_message_id() {
            receipt.message_id = message_id.to_string();
        }
        if let Some(state) = self.optional.message_state() {
            receipt.state = Some(state);
        }

        Some(receipt)
    }
}
