use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    decode::Decode,
    encode::{Encode, IsNull},
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    FromRow, Postgres, Type,
};
use uuid::Uuid;

use crate::domain::money::Cents;

/// Implements the string codec shared by every enum persisted in a `TEXT`
/// column: `as_str`, `FromStr`, `Display`, and the sqlx encode/decode pair.
macro_rules! text_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $value:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $value),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = EnumParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($value => Ok($ty::$variant),)+
                    _ => Err(EnumParseError::new($label, value)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <str as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <str as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                let value = self.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&value, buf)
            }

            fn size_hint(&self) -> usize {
                let value = self.as_str();
                <&str as Encode<Postgres>>::size_hint(&value)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&str as Decode<Postgres>>::decode(value)?;
                raw.parse::<$ty>().map_err(|err| Box::new(err) as BoxDynError)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "operador")]
    Operator,
    #[serde(rename = "gerente")]
    Manager,
    #[serde(rename = "admin")]
    Admin,
}

text_enum!(Role, "role", {
    Operator => "operador",
    Manager => "gerente",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RegisterStatus {
    #[serde(rename = "aberto")]
    Open,
    #[serde(rename = "fechado")]
    Closed,
}

text_enum!(RegisterStatus, "register status", {
    Open => "aberto",
    Closed => "fechado",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MovementDirection {
    #[serde(rename = "entrada")]
    Inflow,
    #[serde(rename = "saida")]
    Outflow,
}

text_enum!(MovementDirection, "movement direction", {
    Inflow => "entrada",
    Outflow => "saida",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaymentMethod {
    #[serde(rename = "dinheiro")]
    Cash,
    #[serde(rename = "pix")]
    Pix,
    #[serde(rename = "cartao_credito")]
    CreditCard,
    #[serde(rename = "cartao_debito")]
    DebitCard,
    #[serde(rename = "vale")]
    Voucher,
    #[serde(rename = "boleto")]
    BankSlip,
    #[serde(rename = "outro")]
    Other,
}

text_enum!(PaymentMethod, "payment method", {
    Cash => "dinheiro",
    Pix => "pix",
    CreditCard => "cartao_credito",
    DebitCard => "cartao_debito",
    Voucher => "vale",
    BankSlip => "boleto",
    Other => "outro",
});

impl PaymentMethod {
    /// Position in `ALL`; summaries use it as a bucket index.
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "realizado")]
    Realized,
    #[serde(rename = "pendente")]
    Pending,
}

text_enum!(PaymentStatus, "payment status", {
    Realized => "realizado",
    Pending => "pendente",
});

#[derive(Debug, Clone)]
pub struct EnumParseError {
    kind: &'static str,
    value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {} value: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub login: String,
    pub name: String,
    pub role: Role,
    pub unit_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A cash register session ("caixa") of one unit for one business date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashRegister {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub business_date: NaiveDate,
    pub status: RegisterStatus,
    pub opening_balance_cents: i64,
    pub opened_by: Uuid,
    pub opened_at: DateTime<Utc>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
    pub counted_cents: Option<i64>,
    pub expected_cents: Option<i64>,
    pub difference_cents: Option<i64>,
    pub notes: Option<String>,
}

impl CashRegister {
    pub fn is_open(&self) -> bool {
        self.status == RegisterStatus::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Movement {
    pub id: Uuid,
    pub register_id: Uuid,
    pub unit_id: Uuid,
    pub amount_cents: i64,
    pub direction: MovementDirection,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub business_date: NaiveDate,
    pub created_by: Uuid,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Movement {
    /// Amount with the sign of its direction: outflows count negative.
    pub fn signed_amount(&self) -> Cents {
        let amount = Cents::from_cents(self.amount_cents);
        match self.direction {
            MovementDirection::Inflow => amount,
            MovementDirection::Outflow => -amount,
        }
    }
}
