// ABOUTME: Supporting types for SMPP session operations including credentials and message builders
// ABOUTME: Provides simplified interfaces for common SMPP operations with sensible defaults

use crate::client::error::SmppError;
use crate::client::state::BindType;
use crate::datatypes::{
    Address, Bind, DataCoding, EsmClass, InterfaceVersion, NumericPlanIndicator, PriorityFlag,
    REGISTERED_DELIVERY_RECEIPT, SubmitSm, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::Bytes;

/// SMPP bind operation credentials
///
/// Contains authentication information and bind type for establishing
/// SMPP sessions with the SMSC.
#[derive(Debug, Clone)]
pub struct BindCredentials {
    pub system_id: String,
    pub password: String,
    /// System type (optional, defaults to empty string)
    pub system_type: Option<String>,
    pub bind_type: BindType,
    pub interface_version: InterfaceVersion,
    /// Addresses served by a receiver or transceiver, usually a regular expression
    pub address_range: Option<String>,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
}

impl BindCredentials {
    pub fn new(
        bind_type: BindType,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: None,
            bind_type,
            interface_version: InterfaceVersion::SmppV34,
            address_range: None,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
        }
    }

    pub fn transmitter(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Transmitter, system_id, password)
    }

    pub fn receiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Receiver, system_id, password)
    }

    pub fn transceiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Transceiver, system_id, password)
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = Some(system_type.into());
        self
    }

    pub fn with_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.interface_version = interface_version;
        self
    }

    pub fn with_address_range(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        range: impl Into<String>,
    ) -> Self {
        self.addr_ton = ton;
        self.addr_npi = npi;
        self.address_range = Some(range.into());
        self
    }

    /// The bind body these credentials describe
    pub fn to_bind(&self) -> Bind {
        Bind {
            system_id: self.system_id.clone(),
            password: self.password.clone(),
            system_type: self.system_type.clone().unwrap_or_default(),
            interface_version: self.interface_version,
            addr_ton: self.addr_ton,
            addr_npi: self.addr_npi,
            address_range: self.address_range.clone().unwrap_or_default(),
            ..Bind::default()
        }
    }
}

/// Simplified SMS message for easy session usage
///
/// Provides a high-level interface for SMS messages with sensible defaults,
/// hiding the complexity of the underlying SubmitSm PDU structure. Long
/// text is split by `Session::submit`.
#[derive(Debug, Clone)]
pub struct SmsMessage {
    /// Destination phone number
    pub to: String,
    /// Source phone number or alphanumeric sender
    pub from: String,
    pub text: String,
    pub options: SmsOptions,
}

impl SmsMessage {
    pub fn new(to: impl Into<String>, from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            text: text.into(),
            options: SmsOptions::default(),
        }
    }

    pub fn builder() -> SmsMessageBuilder {
        SmsMessageBuilder::default()
    }

    /// A submit_sm carrying this message's addressing and options but no
    /// payload; segments fill in `short_message`
    pub fn to_submit_sm(&self, data_coding: DataCoding) -> SubmitSm {
        let options = &self.options;
        let mut submit = SubmitSm::new(
            Address::new(options.source_ton, options.source_npi, self.from.clone()),
            Address::new(options.dest_ton, options.dest_npi, self.to.clone()),
            Bytes::new(),
        );
        submit.service_type = options.service_type.clone();
        submit.esm_class = options.esm_class;
        submit.protocol_id = options.protocol_id;
        submit.priority_flag = options.priority;
        submit.schedule_delivery_time = options.schedule_delivery_time.clone();
        submit.validity_period = options.validity_period.clone();
        submit.registered_delivery = options.registered_delivery;
        submit.data_coding = data_coding;
        submit
    }
}

/// SMS message options with sensible defaults
#[derive(Debug, Clone, Default)]
pub struct SmsOptions {
    pub service_type: String,
    pub priority: PriorityFlag,
    /// `None` uses the session's default data coding
    pub data_coding: Option<DataCoding>,
    pub source_ton: TypeOfNumber,
    pub source_npi: NumericPlanIndicator,
    pub dest_ton: TypeOfNumber,
    pub dest_npi: NumericPlanIndicator,
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    /// Absolute or relative SMPP time string, empty for immediate delivery
    pub schedule_delivery_time: String,
    /// Absolute or relative SMPP time string, empty for the SMSC default
    pub validity_period: String,
    pub registered_delivery: u8,
}

/// Builder for constructing SMS messages with fluent API
#[derive(Debug, Default)]
pub struct SmsMessageBuilder {
    to: Option<String>,
    from: Option<String>,
    text: Option<String>,
    options: SmsOptions,
}

impl SmsMessageBuilder {
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    builder_setters!(options;
        priority: PriorityFlag,
        service_type: String,
        esm_class: EsmClass,
        protocol_id: u8,
        schedule_delivery_time: String,
        validity_period: String,
    );

    pub fn data_coding(mut self, data_coding: DataCoding) -> Self {
        self.options.data_coding = Some(data_coding);
        self
    }

    /// Request an SMSC delivery receipt
    pub fn with_delivery_receipt(mut self) -> Self {
        self.options.registered_delivery |= REGISTERED_DELIVERY_RECEIPT;
        self
    }

    pub fn source_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.options.source_ton = ton;
        self.options.source_npi = npi;
        self
    }

    pub fn dest_numbering(mut self, ton: TypeOfNumber, npi: NumericPlanIndicator) -> Self {
        self.options.dest_ton = ton;
        self.options.dest_npi = npi;
        self
    }

    pub fn build(self) -> Result<SmsMessage, SmppError> {
        let missing = |field: &str| SmppError::InvalidData(format!("{field} is required"));
        let to = self.to.ok_or_else(|| missing("Destination phone number"))?;
        let from = self.from.ok_or_else(|| missing("Source phone number"))?;
        let text = self.text.ok_or_else(|| missing("Message text"))?;

        if to.is_empty() {
            return Err(SmppError::InvalidData(
                "Destination phone number cannot be empty".to_string(),
            ));
        }

        Ok(SmsMessage {
            to,
            from,
            text,
            options: self.options,
        })
    }
}
