//! Regex patterns for driving licence lines.
//!
//! Licence cards number their fields (`3.` date of birth, `4a.` date of
//! issue, and so on), and OCR usually keeps that prefix glued to the value.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // 5. Licence number, e.g. "5.B1234567"
    pub static ref LICENCE_NUMBER: Regex = Regex::new(r"^5\.B\d+").unwrap();

    // National identity card number printed alone on a line
    pub static ref NIC_NUMBER: Regex = Regex::new(r"^\d{11}$").unwrap();

    // 1./2. Name line, e.g. "1.2 PERERA A.B."
    pub static ref NAME: Regex = Regex::new(r"\.2\s+(.*)").unwrap();

    // 8. Address, one or more lines
    pub static ref ADDRESS: Regex = Regex::new(r"^8\.").unwrap();

    // 3. Date of birth, DD.MM.YYYY
    pub static ref DATE_OF_BIRTH: Regex = Regex::new(r"^3\.\d{2}\.\d{2}\.\d{4}").unwrap();

    // 4a. Date of issue
    pub static ref DATE_OF_ISSUE: Regex = Regex::new(r"^4a\.\d{2}\.\d{2}\.\d{4}").unwrap();

    // 4b. Date of expiry
    pub static ref DATE_OF_EXPIRY: Regex = Regex::new(r"^4b\.\d{2}\.\d{2}\.\d{4}").unwrap();

    pub static ref BLOOD_GROUP: Regex = Regex::new(r"(?i)^Blood Group").unwrap();
}
