use crate::error::AppError;
use crate::gateway::types::{AddressSubmission, CardDetails};
use crate::ledger::store::LedgerEntry;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Inbound charge request: amount in major units plus the card and billing
/// address fields. Lives for one HTTP call; card data is never persisted.
#[derive(Clone, Deserialize)]
pub struct ChargeRequest {
    pub name: String,
    pub amount: String,
    pub cvv: String,
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub card_pin: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

impl std::fmt::Debug for ChargeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargeRequest")
            .field("name", &self.name)
            .field("amount", &self.amount)
            .field("card", &"<redacted>")
            .finish()
    }
}

impl ChargeRequest {
    /// Field presence plus a positive numeric amount. Runs before any
    /// gateway call so a rejection here has no side effects.
    pub fn validate(&self) -> Result<BigDecimal, AppError> {
        let required = [
            ("name", &self.name),
            ("amount", &self.amount),
            ("cvv", &self.cvv),
            ("card_number", &self.card_number),
            ("expiry_month", &self.expiry_month),
            ("expiry_year", &self.expiry_year),
            ("card_pin", &self.card_pin),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipcode", &self.zipcode),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation {
                    message: format!("{} is required", field),
                    field: Some(field.to_string()),
                });
            }
        }

        let amount = BigDecimal::from_str(self.amount.trim()).map_err(|_| AppError::Validation {
            message: format!("invalid decimal amount: {}", self.amount),
            field: Some("amount".to_string()),
        })?;
        if amount <= BigDecimal::from(0) {
            return Err(AppError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some("amount".to_string()),
            });
        }
        Ok(amount)
    }

    pub fn card_details(&self) -> CardDetails {
        CardDetails {
            cvv: self.cvv.clone(),
            number: self.card_number.clone(),
            expiry_month: self.expiry_month.clone(),
            expiry_year: self.expiry_year.clone(),
        }
    }

    pub fn address_submission(&self, reference: String) -> AddressSubmission {
        AddressSubmission {
            reference,
            address: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zipcode.clone(),
        }
    }
}

/// PIN follow-up for a charge the gateway answered with `send_pin`.
#[derive(Clone, Deserialize)]
pub struct PinRequest {
    pub reference: String,
    pub pin: String,
}

impl std::fmt::Debug for PinRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinRequest")
            .field("reference", &self.reference)
            .field("pin", &"<redacted>")
            .finish()
    }
}

impl PinRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.reference.trim().is_empty() {
            return Err(AppError::Validation {
                message: "reference is required".to_string(),
                field: Some("reference".to_string()),
            });
        }
        if self.pin.trim().is_empty() {
            return Err(AppError::Validation {
                message: "pin is required".to_string(),
                field: Some("pin".to_string()),
            });
        }
        Ok(())
    }
}

/// OTP follow-up for a charge the gateway answered with `send_otp`.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpRequest {
    pub reference: String,
    pub otp: String,
}

impl OtpRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.reference.trim().is_empty() {
            return Err(AppError::Validation {
                message: "reference is required".to_string(),
                field: Some("reference".to_string()),
            });
        }
        if self.otp.trim().is_empty() || !self.otp.trim().chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation {
                message: "otp must be numeric".to_string(),
                field: Some("otp".to_string()),
            });
        }
        Ok(())
    }
}

/// Caller-facing reply. Challenges carry the gateway reference the caller
/// must echo on the follow-up call, in the `{msg, data, type}` shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChargeReply {
    Settled {
        msg: String,
        entry: LedgerEntry,
    },
    Challenge {
        msg: String,
        data: String,
        #[serde(rename = "type")]
        kind: &'static str,
    },
    /// Address verification hands back a redirect URL the caller completes
    /// out of band.
    Redirect {
        msg: String,
        #[serde(rename = "type")]
        kind: &'static str,
    },
}

/// The gateway operates in minor units (×100 of the major unit).
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, AppError> {
    let scaled = amount * BigDecimal::from(100);
    if !scaled.is_integer() {
        return Err(AppError::Validation {
            message: format!("amount {} has sub-minor-unit precision", amount),
            field: Some("amount".to_string()),
        });
    }
    scaled.to_i64().ok_or_else(|| AppError::Validation {
        message: format!("amount {} is out of range", amount),
        field: Some("amount".to_string()),
    })
}

pub fn from_minor_units(minor: i64) -> BigDecimal {
    BigDecimal::from(minor) / BigDecimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChargeRequest {
        ChargeRequest {
            name: "Ada".to_string(),
            amount: "25.00".to_string(),
            cvv: "123".to_string(),
            card_number: "4084084084084081".to_string(),
            expiry_month: "01".to_string(),
            expiry_year: "30".to_string(),
            card_pin: "1234".to_string(),
            street: "1 Main St".to_string(),
            city: "Lagos".to_string(),
            state: "LA".to_string(),
            zipcode: "100001".to_string(),
        }
    }

    #[test]
    fn valid_request_parses_amount() {
        assert_eq!(
            request().validate().unwrap(),
            BigDecimal::from_str("25.00").unwrap()
        );
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut req = request();
        req.cvv = " ".to_string();
        let err = req.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn non_numeric_and_non_positive_amounts_are_rejected() {
        let mut req = request();
        req.amount = "abc".to_string();
        assert!(req.validate().is_err());
        req.amount = "0".to_string();
        assert!(req.validate().is_err());
        req.amount = "-5".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn minor_unit_conversion_round_trips() {
        let amount = BigDecimal::from_str("25.00").unwrap();
        let minor = to_minor_units(&amount).unwrap();
        assert_eq!(minor, 2500);
        assert_eq!(from_minor_units(minor), amount);
    }

    #[test]
    fn sub_minor_precision_is_rejected() {
        let amount = BigDecimal::from_str("10.001").unwrap();
        assert!(to_minor_units(&amount).is_err());
    }

    #[test]
    fn otp_must_be_numeric() {
        let ok = OtpRequest {
            reference: "ref1".to_string(),
            otp: "123456".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = OtpRequest {
            reference: "ref1".to_string(),
            otp: "12a456".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn challenge_reply_serializes_in_the_wire_shape() {
        let reply = ChargeReply::Challenge {
            msg: "Enter the OTP sent to your phone".to_string(),
            data: "ref123".to_string(),
            kind: "submit_otp",
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["data"], "ref123");
        assert_eq!(json["type"], "submit_otp");
    }
}
