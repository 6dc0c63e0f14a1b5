//! Form 4 document parser.
//!
//! Decodes one filing's XML payload into issuer/owner metadata and the
//! ordered sequence of non-derivative common-stock transactions. Derivative
//! tables are ignored entirely, and non-derivative entries for securities
//! other than common stock are excluded.

use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::Event;

use insider_core::{Form4Document, IngestError, RawTransaction, Result, TransactionCode};

/// Raw strings accumulated for the transaction block currently being read.
#[derive(Debug, Default)]
struct TransactionFields {
    security_title: String,
    transaction_date: String,
    code: String,
    shares: String,
    price_per_share: String,
    shares_owned_after: String,
}

impl TransactionFields {
    /// True when the filed security is common stock.
    fn is_common_stock(&self) -> bool {
        self.security_title.to_lowercase().contains("common")
    }

    fn into_transaction(self) -> RawTransaction {
        RawTransaction {
            code: TransactionCode::from_code(&self.code),
            shares: parse_decimal(&self.shares).unwrap_or(0.0),
            price_per_share: parse_decimal(&self.price_per_share).unwrap_or(0.0),
            transaction_date: parse_date(&self.transaction_date),
            shares_owned_after: parse_decimal(&self.shares_owned_after).unwrap_or(0.0),
            security_title: self.security_title,
        }
    }
}

/// Parses a Form 4 XML document.
///
/// Missing optional fields default (zero shares/price, no date). A document
/// without the expected root element is malformed and yields a parse error
/// for this filing only.
pub fn parse_form4(xml: &[u8]) -> Result<Form4Document> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| IngestError::Parse(format!("filing is not valid UTF-8: {e}")))?
        .trim_start_matches('\u{feff}');

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut document = Form4Document::default();
    let mut saw_root = false;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut transaction: Option<TransactionFields> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"ownershipDocument" {
                    saw_root = true;
                }
                if name == b"nonDerivativeTransaction" {
                    transaction = Some(TransactionFields::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(_)) => {}
            Ok(Event::Text(t)) => {
                let value = t
                    .unescape()
                    .map_err(|e| IngestError::Parse(format!("filing text: {e}")))?;
                record_text(&path, &value, &mut document, transaction.as_mut());
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"nonDerivativeTransaction" {
                    if let Some(fields) = transaction.take() {
                        if fields.is_common_stock() {
                            document.transactions.push(fields.into_transaction());
                        }
                    }
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(IngestError::Parse(format!("malformed filing: {e}"))),
        }
    }

    if !saw_root {
        return Err(IngestError::Parse(
            "document is not an ownership document".to_string(),
        ));
    }

    Ok(document)
}

/// Routes one text node to the field its element path addresses.
fn record_text(
    path: &[Vec<u8>],
    value: &str,
    document: &mut Form4Document,
    transaction: Option<&mut TransactionFields>,
) {
    if let Some(fields) = transaction {
        if ends_with(path, &[b"securityTitle", b"value"]) {
            fields.security_title = value.to_string();
        } else if ends_with(path, &[b"transactionDate", b"value"]) {
            fields.transaction_date = value.to_string();
        } else if ends_with(path, &[b"transactionCoding", b"transactionCode"]) {
            fields.code = value.to_string();
        } else if ends_with(path, &[b"transactionShares", b"value"]) {
            fields.shares = value.to_string();
        } else if ends_with(path, &[b"transactionPricePerShare", b"value"]) {
            fields.price_per_share = value.to_string();
        } else if ends_with(path, &[b"sharesOwnedFollowingTransaction", b"value"]) {
            fields.shares_owned_after = value.to_string();
        }
        return;
    }

    if ends_with(path, &[b"issuer", b"issuerName"]) {
        document.issuer.name = value.to_string();
    } else if ends_with(path, &[b"issuer", b"issuerTradingSymbol"]) {
        document.issuer.trading_symbol = value.to_string();
    } else if ends_with(path, &[b"reportingOwnerId", b"rptOwnerName"]) {
        document.owner.name = value.to_string();
    } else if ends_with(path, &[b"reportingOwnerRelationship", b"isDirector"]) {
        document.owner.is_director = parse_flag(value);
    } else if ends_with(path, &[b"reportingOwnerRelationship", b"isOfficer"]) {
        document.owner.is_officer = parse_flag(value);
    } else if ends_with(path, &[b"reportingOwnerRelationship", b"officerTitle"]) {
        document.owner.officer_title = Some(value.to_string());
    } else if ends_with(path, &[b"reportingOwnerRelationship", b"isTenPercentOwner"]) {
        document.owner.is_ten_percent_owner = parse_flag(value);
    } else if ends_with(path, &[b"reportingOwnerRelationship", b"isOther"]) {
        document.owner.is_other = parse_flag(value);
    }
}

/// True when the element path ends with the given tail.
fn ends_with(path: &[Vec<u8>], tail: &[&[u8]]) -> bool {
    path.len() >= tail.len()
        && path
            .iter()
            .rev()
            .zip(tail.iter().rev())
            .all(|(a, b)| a.as_slice() == *b)
}

/// Parses a filed decimal, tolerating thousands separators.
fn parse_decimal(value: &str) -> Option<f64> {
    value.replace(',', "").trim().parse::<f64>().ok()
}

/// Parses a filed date, tolerating trailing timezone noise.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Boolean flags appear as "1"/"0" or "true"/"false" depending on the filer
/// software.
fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "True")
}

#[cfg(test)]
mod tests {
    use super::*;
    use insider_core::Symbol;

    pub(crate) const FORM4_FIXTURE: &str = r#"<?xml version="1.0"?>
<ownershipDocument>
  <schemaVersion>X0306</schemaVersion>
  <documentType>4</documentType>
  <issuer>
    <issuerCik>0009999999</issuerCik>
    <issuerName>Acme Corp</issuerName>
    <issuerTradingSymbol>ACME</issuerTradingSymbol>
  </issuer>
  <reportingOwner>
    <reportingOwnerId>
      <rptOwnerCik>0001111111</rptOwnerCik>
      <rptOwnerName>Doe Jane</rptOwnerName>
    </reportingOwnerId>
    <reportingOwnerRelationship>
      <isDirector>1</isDirector>
      <isOfficer>1</isOfficer>
      <officerTitle>Chief Executive Officer</officerTitle>
    </reportingOwnerRelationship>
  </reportingOwner>
  <nonDerivativeTable>
    <nonDerivativeTransaction>
      <securityTitle><value>Common Stock</value></securityTitle>
      <transactionDate><value>2025-06-03</value></transactionDate>
      <transactionCoding>
        <transactionFormType>4</transactionFormType>
        <transactionCode>P</transactionCode>
        <equitySwapInvolved>0</equitySwapInvolved>
      </transactionCoding>
      <transactionAmounts>
        <transactionShares><value>1,000</value></transactionShares>
        <transactionPricePerShare><value>10.50</value></transactionPricePerShare>
        <transactionAcquiredDisposedCode><value>A</value></transactionAcquiredDisposedCode>
      </transactionAmounts>
      <postTransactionAmounts>
        <sharesOwnedFollowingTransaction><value>5000</value></sharesOwnedFollowingTransaction>
      </postTransactionAmounts>
    </nonDerivativeTransaction>
    <nonDerivativeTransaction>
      <securityTitle><value>Class A Common Stock</value></securityTitle>
      <transactionDate><value>2025-06-04</value></transactionDate>
      <transactionCoding>
        <transactionCode>S</transactionCode>
      </transactionCoding>
      <transactionAmounts>
        <transactionShares><value>200</value></transactionShares>
        <transactionPricePerShare><value>11.00</value></transactionPricePerShare>
      </transactionAmounts>
      <postTransactionAmounts>
        <sharesOwnedFollowingTransaction><value>4800</value></sharesOwnedFollowingTransaction>
      </postTransactionAmounts>
    </nonDerivativeTransaction>
    <nonDerivativeTransaction>
      <securityTitle><value>Series B Preferred Stock</value></securityTitle>
      <transactionCoding>
        <transactionCode>P</transactionCode>
      </transactionCoding>
      <transactionAmounts>
        <transactionShares><value>50</value></transactionShares>
        <transactionPricePerShare><value>100.00</value></transactionPricePerShare>
      </transactionAmounts>
    </nonDerivativeTransaction>
  </nonDerivativeTable>
  <derivativeTable>
    <derivativeTransaction>
      <securityTitle><value>Employee Stock Option</value></securityTitle>
      <transactionCoding>
        <transactionCode>M</transactionCode>
      </transactionCoding>
      <transactionAmounts>
        <transactionShares><value>9999</value></transactionShares>
        <transactionPricePerShare><value>1.00</value></transactionPricePerShare>
      </transactionAmounts>
    </derivativeTransaction>
  </derivativeTable>
</ownershipDocument>"#;

    #[test]
    fn parses_common_stock_transactions_in_order() {
        let document = parse_form4(FORM4_FIXTURE.as_bytes()).unwrap();

        assert_eq!(document.issuer.name, "Acme Corp");
        assert_eq!(document.issuer.symbol(), Some(Symbol::new("ACME")));
        assert_eq!(document.owner.name, "Doe Jane");
        assert_eq!(
            document.owner.title().as_deref(),
            Some("Director & Chief Executive Officer")
        );

        // Preferred-stock and derivative blocks are excluded; order preserved.
        assert_eq!(document.transactions.len(), 2);
        let purchase = &document.transactions[0];
        assert_eq!(purchase.code, TransactionCode::Purchase);
        assert_eq!(purchase.shares, 1000.0);
        assert_eq!(purchase.price_per_share, 10.5);
        assert_eq!(purchase.shares_owned_after, 5000.0);
        assert_eq!(
            purchase.transaction_date,
            NaiveDate::from_ymd_opt(2025, 6, 3)
        );
        let sale = &document.transactions[1];
        assert_eq!(sale.code, TransactionCode::Sale);
        assert_eq!(sale.security_title, "Class A Common Stock");
    }

    #[test]
    fn derivative_only_documents_yield_empty_sequence() {
        let xml = r#"<ownershipDocument>
          <issuer>
            <issuerName>Acme Corp</issuerName>
            <issuerTradingSymbol>ACME</issuerTradingSymbol>
          </issuer>
          <derivativeTable>
            <derivativeTransaction>
              <securityTitle><value>Stock Option</value></securityTitle>
              <transactionCoding><transactionCode>M</transactionCode></transactionCoding>
            </derivativeTransaction>
          </derivativeTable>
        </ownershipDocument>"#;

        let document = parse_form4(xml.as_bytes()).unwrap();
        assert!(document.transactions.is_empty());
    }

    #[test]
    fn unrecognized_codes_are_kept_as_other() {
        let xml = r#"<ownershipDocument>
          <issuer>
            <issuerName>Acme Corp</issuerName>
            <issuerTradingSymbol>ACME</issuerTradingSymbol>
          </issuer>
          <nonDerivativeTable>
            <nonDerivativeTransaction>
              <securityTitle><value>Common Stock</value></securityTitle>
              <transactionCoding><transactionCode>X</transactionCode></transactionCoding>
              <transactionAmounts>
                <transactionShares><value>10</value></transactionShares>
              </transactionAmounts>
            </nonDerivativeTransaction>
          </nonDerivativeTable>
        </ownershipDocument>"#;

        let document = parse_form4(xml.as_bytes()).unwrap();
        assert_eq!(document.transactions.len(), 1);
        assert_eq!(document.transactions[0].code, TransactionCode::Other);
    }

    #[test]
    fn missing_optional_fields_default() {
        let xml = r#"<ownershipDocument>
          <issuer><issuerName>Acme Corp</issuerName></issuer>
          <nonDerivativeTable>
            <nonDerivativeTransaction>
              <securityTitle><value>Common Stock</value></securityTitle>
              <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
            </nonDerivativeTransaction>
          </nonDerivativeTable>
        </ownershipDocument>"#;

        let document = parse_form4(xml.as_bytes()).unwrap();
        assert_eq!(document.issuer.symbol(), None);
        let transaction = &document.transactions[0];
        assert_eq!(transaction.shares, 0.0);
        assert_eq!(transaction.price_per_share, 0.0);
        assert_eq!(transaction.shares_owned_after, 0.0);
        assert_eq!(transaction.transaction_date, None);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            parse_form4(b"<html>error page</html>"),
            Err(IngestError::Parse(_))
        ));
        assert!(matches!(
            parse_form4(b"<ownershipDocument><unclosed"),
            Err(IngestError::Parse(_))
        ));
    }
}
