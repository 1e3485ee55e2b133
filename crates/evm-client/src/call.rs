//! Contract call description and decoded values
//!
//! The transport encodes [`ContractCall`]s against the ABI named by the
//! call's [`ContractInterface`]; this crate only carries structured values.

use bold_core::{Address, Bytes, ChainError, ContractInterface, ContractRef, I256, U256};
use serde::{Deserialize, Serialize};

/// ABI value passed to or returned from a contract function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallValue {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    Bytes(Bytes),
    /// Positional multi-value return or tuple argument
    Tuple(Vec<CallValue>),
    /// Named struct argument (field order is the ABI order)
    Struct(Vec<(String, CallValue)>),
}

impl CallValue {
    /// Build a struct argument from `(name, value)` pairs
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, CallValue)>,
        S: Into<String>,
    {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<I256> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Element of a tuple return
    pub fn item(&self, index: usize) -> Option<&CallValue> {
        match self {
            Self::Tuple(items) => items.get(index),
            _ => None,
        }
    }

    /// Field of a struct value
    pub fn field(&self, name: &str) -> Option<&CallValue> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    // Decoding helpers that turn a shape mismatch into a chain error

    pub fn expect_uint(&self, function: &'static str) -> Result<U256, ChainError> {
        self.as_uint().ok_or_else(|| mismatch(function, "uint256", self))
    }

    pub fn expect_address(&self, function: &'static str) -> Result<Address, ChainError> {
        self.as_address().ok_or_else(|| mismatch(function, "address", self))
    }

    pub fn expect_item(&self, function: &'static str, index: usize) -> Result<&CallValue, ChainError> {
        self.item(index)
            .ok_or_else(|| mismatch(function, &format!("tuple with index {}", index), self))
    }

    pub fn expect_uint_at(&self, function: &'static str, index: usize) -> Result<U256, ChainError> {
        self.expect_item(function, index)?.expect_uint(function)
    }
}

fn mismatch(function: &'static str, expected: &str, got: &CallValue) -> ChainError {
    ChainError::UnexpectedResponse {
        function,
        message: format!("expected {}, got {:?}", expected, got),
    }
}

impl From<U256> for CallValue {
    fn from(v: U256) -> Self {
        Self::Uint(v)
    }
}

impl From<I256> for CallValue {
    fn from(v: I256) -> Self {
        Self::Int(v)
    }
}

impl From<Address> for CallValue {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

impl From<bool> for CallValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u64> for CallValue {
    fn from(v: u64) -> Self {
        Self::Uint(U256::from(v))
    }
}

/// A read or a transaction against one contract function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractCall {
    pub contract: ContractRef,
    pub function: &'static str,
    pub args: Vec<CallValue>,
    /// Native value attached (wei); zero for reads
    pub value: U256,
}

impl ContractCall {
    pub fn new(contract: ContractRef, function: &'static str) -> Self {
        Self {
            contract,
            function,
            args: Vec::new(),
            value: U256::ZERO,
        }
    }

    pub fn arg(mut self, value: impl Into<CallValue>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CallValue>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn address(&self) -> Address {
        self.contract.address
    }

    pub fn interface(&self) -> ContractInterface {
        self.contract.interface
    }
}
