//! Binary and JSON payload codec.
//!
//! Portal deposits use fixed byte offsets, user operations are UTF-8 JSON,
//! inspect queries are hex address text, and vouchers carry ABI call-data
//! for the settlement-layer contracts.

use alloy_primitives::{Address, U256, keccak256};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::{Asset, BalanceQuery, Operation, Voucher, WalletError, Withdrawal};

/// `depositor (20) || amount (32)`
pub const ETHER_DEPOSIT_LEN: usize = 52;
/// `contract (20) || account (20) || token_id (32)`
pub const ERC721_DEPOSIT_LEN: usize = 72;

pub const WITHDRAW_ETHER_SIGNATURE: &str = "withdrawEther(address,uint256)";
pub const SAFE_TRANSFER_FROM_SIGNATURE: &str = "safeTransferFrom(address,address,uint256)";

fn malformed(msg: impl Into<String>) -> WalletError {
    WalletError::MalformedPayload(msg.into())
}

// ---------------------------------------------------------------------------
// Portal deposits
// ---------------------------------------------------------------------------

/// Native currency deposit notification from the ether portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtherDeposit {
    pub depositor: Address,
    pub amount: U256,
}

/// Token deposit notification from the ERC-721 portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erc721Deposit {
    pub contract: Address,
    pub account: Address,
    pub token_id: U256,
}

/// Bytes past the fixed layout (portal exec-layer data) are ignored.
pub fn decode_ether_deposit(payload: &[u8]) -> Result<EtherDeposit, WalletError> {
    if payload.len() < ETHER_DEPOSIT_LEN {
        return Err(malformed(format!(
            "ether deposit needs {} bytes, got {}",
            ETHER_DEPOSIT_LEN,
            payload.len()
        )));
    }
    Ok(EtherDeposit {
        depositor: Address::from_slice(&payload[0..20]),
        amount: U256::from_be_slice(&payload[20..52]),
    })
}

pub fn encode_ether_deposit(deposit: &EtherDeposit) -> Vec<u8> {
    let mut out = Vec::with_capacity(ETHER_DEPOSIT_LEN);
    out.extend_from_slice(deposit.depositor.as_slice());
    out.extend_from_slice(&deposit.amount.to_be_bytes::<32>());
    out
}

pub fn decode_erc721_deposit(payload: &[u8]) -> Result<Erc721Deposit, WalletError> {
    if payload.len() < ERC721_DEPOSIT_LEN {
        return Err(malformed(format!(
            "erc721 deposit needs {} bytes, got {}",
            ERC721_DEPOSIT_LEN,
            payload.len()
        )));
    }
    Ok(Erc721Deposit {
        contract: Address::from_slice(&payload[0..20]),
        account: Address::from_slice(&payload[20..40]),
        token_id: U256::from_be_slice(&payload[40..72]),
    })
}

pub fn encode_erc721_deposit(deposit: &Erc721Deposit) -> Vec<u8> {
    let mut out = Vec::with_capacity(ERC721_DEPOSIT_LEN);
    out.extend_from_slice(deposit.contract.as_slice());
    out.extend_from_slice(deposit.account.as_slice());
    out.extend_from_slice(&deposit.token_id.to_be_bytes::<32>());
    out
}

/// Payload sent by the dApp address relay: the first 20 bytes are the
/// application's own address on the settlement layer.
pub fn decode_dapp_address(payload: &[u8]) -> Result<Address, WalletError> {
    if payload.len() < 20 {
        return Err(malformed(format!(
            "dApp address relay needs 20 bytes, got {}",
            payload.len()
        )));
    }
    Ok(Address::from_slice(&payload[0..20]))
}

// ---------------------------------------------------------------------------
// User operations
// ---------------------------------------------------------------------------

/// Amounts and token ids arrive either as JSON numbers or as decimal / `0x`
/// hex strings. Numbers keep their literal text so wei amounts past `u64`
/// survive intact.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Quantity {
    Number(serde_json::Number),
    Text(String),
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(Quantity::Number(n)),
            Value::String(s) => Ok(Quantity::Text(s)),
            other => Err(de::Error::custom(format!(
                "expected a number or numeric string, got {other}"
            ))),
        }
    }
}

impl Quantity {
    fn to_u256(&self, field: &str) -> Result<U256, WalletError> {
        match self {
            Quantity::Number(n) => n
                .to_string()
                .parse::<U256>()
                .map_err(|e| malformed(format!("invalid {field} {n}: {e}"))),
            Quantity::Text(s) => s
                .trim()
                .parse::<U256>()
                .map_err(|e| malformed(format!("invalid {field} {s:?}: {e}"))),
        }
    }
}

/// Wire shape of an operation before validation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct OperationRecord {
    operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    erc721: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_id: Option<Quantity>,
}

impl OperationRecord {
    fn require<T: Clone>(&self, value: &Option<T>, field: &str) -> Result<T, WalletError> {
        value.clone().ok_or_else(|| {
            WalletError::UnrecognizedOperation(format!(
                "{}: missing field `{}`",
                self.operation, field
            ))
        })
    }

    /// An `erc721` field selects the token variant; otherwise it is ether.
    fn asset(&self) -> Result<Asset, WalletError> {
        match self.erc721 {
            Some(contract) => {
                let token_id = self.require(&self.token_id, "token_id")?;
                Ok(Asset::Erc721 {
                    contract,
                    token_id: token_id.to_u256("token_id")?,
                })
            }
            None => {
                let amount = self.require(&self.amount, "amount")?;
                Ok(Asset::Ether(amount.to_u256("amount")?))
            }
        }
    }

    fn into_operation(self) -> Result<Operation, WalletError> {
        match self.operation.as_str() {
            "transfer" => Ok(Operation::Transfer {
                from: self.require(&self.from, "from")?,
                to: self.require(&self.to, "to")?,
                asset: self.asset()?,
            }),
            "withdraw" => Ok(Operation::Withdraw {
                from: self.require(&self.from, "from")?,
                asset: self.asset()?,
            }),
            _ => Ok(Operation::Unrecognized {
                operation: self.operation.clone(),
            }),
        }
    }

    fn with_asset(mut self, asset: &Asset) -> Self {
        match asset {
            Asset::Ether(amount) => {
                self.amount = Some(Quantity::Text(amount.to_string()));
            }
            Asset::Erc721 { contract, token_id } => {
                self.erc721 = Some(*contract);
                self.token_id = Some(Quantity::Text(token_id.to_string()));
            }
        }
        self
    }
}

/// Parse and validate a user operation.
///
/// Unknown operation tags decode to [`Operation::Unrecognized`]; a known tag
/// with missing fields fails with [`WalletError::UnrecognizedOperation`].
pub fn decode_operation(payload: &[u8]) -> Result<Operation, WalletError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| malformed(format!("operation is not UTF-8: {e}")))?;
    let record: OperationRecord = serde_json::from_str(text)
        .map_err(|e| malformed(format!("operation is not a valid record: {e}")))?;
    record.into_operation()
}

pub fn encode_operation(operation: &Operation) -> Vec<u8> {
    let record = match operation {
        Operation::Transfer { from, to, asset } => OperationRecord {
            operation: "transfer".to_string(),
            from: Some(*from),
            to: Some(*to),
            ..Default::default()
        }
        .with_asset(asset),
        Operation::Withdraw { from, asset } => OperationRecord {
            operation: "withdraw".to_string(),
            from: Some(*from),
            ..Default::default()
        }
        .with_asset(asset),
        Operation::Unrecognized { operation } => OperationRecord {
            operation: operation.clone(),
            ..Default::default()
        },
    };
    // A struct of strings, addresses and options always serializes.
    serde_json::to_vec(&record).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Inspect queries
// ---------------------------------------------------------------------------

fn parse_address_hex(hex_str: &str) -> Result<Address, WalletError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| malformed(format!("invalid address hex {hex_str:?}: {e}")))?;
    Ok(Address::from_slice(&bytes))
}

/// `[0x]<account:40>` asks for the ether balance,
/// `[0x]<account:40><contract:40>` for the tokens of one contract.
pub fn decode_inspect(payload: &[u8]) -> Result<BalanceQuery, WalletError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| malformed(format!("inspect payload is not UTF-8: {e}")))?
        .trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if !digits.is_ascii() {
        return Err(malformed("inspect payload is not hex"));
    }
    match digits.len() {
        40 => Ok(BalanceQuery::Ether {
            account: parse_address_hex(digits)?,
        }),
        80 => Ok(BalanceQuery::Erc721 {
            account: parse_address_hex(&digits[..40])?,
            contract: parse_address_hex(&digits[40..])?,
        }),
        n => Err(malformed(format!(
            "inspect payload must be 40 or 80 hex chars, got {n}"
        ))),
    }
}

pub fn encode_inspect(query: &BalanceQuery) -> Vec<u8> {
    let text = match query {
        BalanceQuery::Ether { account } => format!("0x{}", hex::encode(account.as_slice())),
        BalanceQuery::Erc721 { account, contract } => {
            format!("0x{}{}", hex::encode(account.as_slice()), hex::encode(contract.as_slice()))
        }
    };
    text.into_bytes()
}

// ---------------------------------------------------------------------------
// Voucher call-data
// ---------------------------------------------------------------------------

/// First four bytes of the keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn encode_call(signature: &str, words: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32 * words.len());
    out.extend_from_slice(&selector(signature));
    for word in words {
        out.extend_from_slice(word);
    }
    out
}

impl Withdrawal {
    /// Encode the settlement-layer call for this withdrawal.
    ///
    /// `dapp` is the application contract holding the deposited assets: the
    /// voucher target for ether and the token source for ERC-721.
    pub fn voucher(&self, dapp: Address) -> Voucher {
        match self.asset {
            Asset::Ether(amount) => Voucher {
                destination: dapp,
                payload: encode_call(
                    WITHDRAW_ETHER_SIGNATURE,
                    &[address_word(&self.receiver), amount.to_be_bytes::<32>()],
                ),
            },
            Asset::Erc721 { contract, token_id } => Voucher {
                destination: contract,
                payload: encode_call(
                    SAFE_TRANSFER_FROM_SIGNATURE,
                    &[
                        address_word(&dapp),
                        address_word(&self.receiver),
                        token_id.to_be_bytes::<32>(),
                    ],
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);
    const NFT: Address = Address::repeat_byte(0x72);
    const DAPP: Address = Address::repeat_byte(0xda);

    #[test]
    fn test_decode_ether_deposit_exact_layout() {
        let mut payload = ALICE.as_slice().to_vec();
        let mut amount = [0u8; 32];
        amount[31] = 100;
        payload.extend_from_slice(&amount);
        assert_eq!(payload.len(), 52);

        let deposit = decode_ether_deposit(&payload).unwrap();
        assert_eq!(deposit.depositor, ALICE);
        assert_eq!(deposit.amount, U256::from(100));
    }

    #[test]
    fn test_decode_ether_deposit_ignores_trailing_bytes() {
        let deposit = EtherDeposit {
            depositor: BOB,
            amount: U256::from(1_000_000_000_000_000_000u128),
        };
        let mut payload = encode_ether_deposit(&deposit);
        payload.extend_from_slice(b"exec layer data");
        assert_eq!(decode_ether_deposit(&payload).unwrap(), deposit);
    }

    #[test]
    fn test_decode_ether_deposit_short_payload() {
        let payload = vec![0u8; 51];
        let err = decode_ether_deposit(&payload).unwrap_err();
        assert!(matches!(err, WalletError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_erc721_deposit() {
        let mut payload = NFT.as_slice().to_vec();
        payload.extend_from_slice(ALICE.as_slice());
        payload.extend_from_slice(&U256::from(7).to_be_bytes::<32>());

        let deposit = decode_erc721_deposit(&payload).unwrap();
        assert_eq!(deposit.contract, NFT);
        assert_eq!(deposit.account, ALICE);
        assert_eq!(deposit.token_id, U256::from(7));

        let err = decode_erc721_deposit(&payload[..71]).unwrap_err();
        assert!(matches!(err, WalletError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_dapp_address() {
        assert_eq!(decode_dapp_address(DAPP.as_slice()).unwrap(), DAPP);
        assert!(decode_dapp_address(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_decode_transfer_with_numeric_amount() {
        let payload = format!(
            r#"{{"operation":"transfer","from":"{ALICE}","to":"{BOB}","amount":40}}"#
        );
        let op = decode_operation(payload.as_bytes()).unwrap();
        assert_eq!(
            op,
            Operation::Transfer {
                from: ALICE,
                to: BOB,
                asset: Asset::Ether(U256::from(40)),
            }
        );
    }

    #[test]
    fn test_decode_numeric_amount_wider_than_u64() {
        let payload = format!(
            r#"{{"operation":"withdraw","from":"{ALICE}","amount":20000000000000000000}}"#
        );
        assert_eq!(
            decode_operation(payload.as_bytes()).unwrap(),
            Operation::Withdraw {
                from: ALICE,
                asset: Asset::Ether(U256::from(20_000_000_000_000_000_000u128)),
            }
        );

        let huge = U256::from(1u8) << 200;
        let payload = format!(
            r#"{{"operation":"transfer","from":"{ALICE}","to":"{BOB}","erc721":"{NFT}","token_id":{huge}}}"#
        );
        assert_eq!(
            decode_operation(payload.as_bytes()).unwrap(),
            Operation::Transfer {
                from: ALICE,
                to: BOB,
                asset: Asset::Erc721 {
                    contract: NFT,
                    token_id: huge,
                },
            }
        );

        let fractional = format!(r#"{{"operation":"withdraw","from":"{ALICE}","amount":1.5}}"#);
        assert!(matches!(
            decode_operation(fractional.as_bytes()).unwrap_err(),
            WalletError::MalformedPayload(_)
        ));
    }

    #[test]
    fn test_decode_withdraw_with_string_amounts() {
        let decimal = format!(
            r#"{{"operation":"withdraw","from":"{ALICE}","amount":"1000000000000000000000"}}"#
        );
        let op = decode_operation(decimal.as_bytes()).unwrap();
        assert_eq!(
            op,
            Operation::Withdraw {
                from: ALICE,
                asset: Asset::Ether(U256::from(1_000_000_000_000_000_000_000u128)),
            }
        );

        let hex_amount = format!(r#"{{"operation":"withdraw","from":"{ALICE}","amount":"0xff"}}"#);
        let op = decode_operation(hex_amount.as_bytes()).unwrap();
        assert_eq!(
            op,
            Operation::Withdraw {
                from: ALICE,
                asset: Asset::Ether(U256::from(255)),
            }
        );
    }

    #[test]
    fn test_decode_erc721_operation() {
        let payload = format!(
            r#"{{"operation":"transfer","from":"{ALICE}","to":"{BOB}","erc721":"{NFT}","token_id":7}}"#
        );
        let op = decode_operation(payload.as_bytes()).unwrap();
        assert_eq!(
            op,
            Operation::Transfer {
                from: ALICE,
                to: BOB,
                asset: Asset::Erc721 {
                    contract: NFT,
                    token_id: U256::from(7),
                },
            }
        );
    }

    #[test]
    fn test_decode_operation_addresses_any_case() {
        let lower = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
        let upper = "0xA1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1";
        let payload =
            format!(r#"{{"operation":"transfer","from":"{lower}","to":"{upper}","amount":1}}"#);
        match decode_operation(payload.as_bytes()).unwrap() {
            Operation::Transfer { from, to, .. } => {
                assert_eq!(from, ALICE);
                assert_eq!(to, ALICE);
            }
            other => panic!("unexpected operation {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_operation_tag() {
        let op = decode_operation(br#"{"operation":"mint","amount":5}"#).unwrap();
        assert_eq!(
            op,
            Operation::Unrecognized {
                operation: "mint".to_string()
            }
        );
    }

    #[test]
    fn test_decode_operation_missing_field() {
        let payload = format!(r#"{{"operation":"transfer","from":"{ALICE}","amount":5}}"#);
        let err = decode_operation(payload.as_bytes()).unwrap_err();
        assert!(matches!(err, WalletError::UnrecognizedOperation(_)));
    }

    #[test]
    fn test_decode_operation_garbage() {
        assert!(matches!(
            decode_operation(b"not json").unwrap_err(),
            WalletError::MalformedPayload(_)
        ));
        assert!(matches!(
            decode_operation(&[0xff, 0xfe, 0x00]).unwrap_err(),
            WalletError::MalformedPayload(_)
        ));
        let negative = format!(r#"{{"operation":"withdraw","from":"{ALICE}","amount":-1}}"#);
        assert!(matches!(
            decode_operation(negative.as_bytes()).unwrap_err(),
            WalletError::MalformedPayload(_)
        ));
    }

    #[test]
    fn test_encoded_operation_decodes_back() {
        let op = Operation::Withdraw {
            from: BOB,
            asset: Asset::Erc721 {
                contract: NFT,
                token_id: U256::from(99),
            },
        };
        assert_eq!(decode_operation(&encode_operation(&op)).unwrap(), op);
    }

    #[test]
    fn test_decode_inspect() {
        let ether = format!("0x{}", hex::encode(ALICE.as_slice()));
        assert_eq!(
            decode_inspect(ether.as_bytes()).unwrap(),
            BalanceQuery::Ether { account: ALICE }
        );

        let tokens = format!("{}{}", hex::encode(ALICE.as_slice()), hex::encode(NFT.as_slice()));
        assert_eq!(
            decode_inspect(tokens.as_bytes()).unwrap(),
            BalanceQuery::Erc721 {
                account: ALICE,
                contract: NFT,
            }
        );

        assert!(decode_inspect(b"0x1234").is_err());
        assert!(decode_inspect("é".repeat(20).as_bytes()).is_err());
    }

    #[test]
    fn test_safe_transfer_from_selector() {
        assert_eq!(
            selector(SAFE_TRANSFER_FROM_SIGNATURE),
            [0x42, 0x84, 0x2e, 0x0e]
        );
    }

    #[test]
    fn test_ether_withdrawal_voucher() {
        let withdrawal = Withdrawal {
            receiver: ALICE,
            asset: Asset::Ether(U256::from(60)),
        };
        let voucher = withdrawal.voucher(DAPP);

        assert_eq!(voucher.destination, DAPP);
        assert_eq!(voucher.payload.len(), 4 + 64);
        assert_eq!(&voucher.payload[..4], &selector(WITHDRAW_ETHER_SIGNATURE));
        assert_eq!(&voucher.payload[4..16], &[0u8; 12]);
        assert_eq!(&voucher.payload[16..36], ALICE.as_slice());
        assert_eq!(U256::from_be_slice(&voucher.payload[36..68]), U256::from(60));
    }

    #[test]
    fn test_erc721_withdrawal_voucher() {
        let withdrawal = Withdrawal {
            receiver: BOB,
            asset: Asset::Erc721 {
                contract: NFT,
                token_id: U256::from(7),
            },
        };
        let voucher = withdrawal.voucher(DAPP);

        assert_eq!(voucher.destination, NFT);
        assert_eq!(voucher.payload.len(), 4 + 96);
        assert_eq!(&voucher.payload[..4], &[0x42, 0x84, 0x2e, 0x0e]);
        assert_eq!(&voucher.payload[16..36], DAPP.as_slice());
        assert_eq!(&voucher.payload[48..68], BOB.as_slice());
        assert_eq!(U256::from_be_slice(&voucher.payload[68..100]), U256::from(7));
    }
}
