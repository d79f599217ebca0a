//! Country table used to sort proxies into regional groups.
//!
//! A proxy name is matched against each entry in table order: flag emoji
//! first, then CJK keywords, then ASCII keywords. ASCII keywords only match
//! as whole words so that `US` does not fire inside `RUSSIA` nor `GB` inside
//! `10GB`. Two-letter codes are matched in upper case only, English names in
//! any case.

use lazy_static::lazy_static;
use regex::Regex;

/// Group collecting proxies no country matched.
pub const OTHER_GROUP: &str = "Other";

#[derive(Debug)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code, upper case.
    pub code: &'static str,
    pub name: &'static str,
    /// Non-ASCII keywords matched as plain substrings.
    keywords: &'static [&'static str],
    /// English names matched case-insensitively as whole words.
    english: &'static [&'static str],
}

macro_rules! country {
    ($code:literal, $name:literal, [$($kw:literal),*], [$($en:literal),*]) => {
        Country {
            code: $code,
            name: $name,
            keywords: &[$($kw),*],
            english: &[$($en),*],
        }
    };
}

/// Entries earlier in the table win; Indonesia precedes India because
/// 印度尼西亚 contains 印度.
pub static COUNTRIES: &[Country] = &[
    country!("HK", "Hong Kong", ["香港"], ["hong ?kong"]),
    country!("TW", "Taiwan", ["台湾", "台灣", "台北"], ["taiwan"]),
    country!("MO", "Macau", ["澳门", "澳門"], ["macau", "macao"]),
    country!("JP", "Japan", ["日本", "东京", "大阪"], ["japan", "tokyo", "osaka"]),
    country!("KR", "Korea", ["韩国", "韓國", "首尔"], ["korea", "seoul"]),
    country!("SG", "Singapore", ["新加坡", "狮城"], ["singapore"]),
    country!("US", "United States", ["美国", "美國", "洛杉矶", "硅谷"], ["usa", "united ?states", "america", "los ?angeles", "san ?jose", "seattle"]),
    country!("GB", "United Kingdom", ["英国", "英國", "伦敦"], ["uk", "united ?kingdom", "britain", "london"]),
    country!("DE", "Germany", ["德国", "德國", "法兰克福"], ["germany", "frankfurt"]),
    country!("FR", "France", ["法国", "法國", "巴黎"], ["france", "paris"]),
    country!("NL", "Netherlands", ["荷兰", "荷蘭"], ["netherlands", "amsterdam"]),
    country!("RU", "Russia", ["俄罗斯", "俄羅斯", "莫斯科"], ["russia", "moscow"]),
    country!("CA", "Canada", ["加拿大"], ["canada"]),
    country!("AU", "Australia", ["澳大利亚", "澳洲", "悉尼"], ["australia", "sydney"]),
    country!("ID", "Indonesia", ["印度尼西亚", "印尼"], ["indonesia", "jakarta"]),
    country!("IN", "India", ["印度"], ["india", "mumbai"]),
    country!("MY", "Malaysia", ["马来西亚", "馬來西亞"], ["malaysia"]),
    country!("TH", "Thailand", ["泰国", "泰國"], ["thailand", "bangkok"]),
    country!("VN", "Vietnam", ["越南"], ["vietnam"]),
    country!("PH", "Philippines", ["菲律宾", "菲律賓"], ["philippines", "manila"]),
    country!("TR", "Turkey", ["土耳其"], ["turkey", "istanbul"]),
    country!("AE", "United Arab Emirates", ["阿联酋", "迪拜"], ["uae", "dubai"]),
    country!("IL", "Israel", ["以色列"], ["israel"]),
    country!("IT", "Italy", ["意大利"], ["italy", "milan"]),
    country!("ES", "Spain", ["西班牙"], ["spain", "madrid"]),
    country!("CH", "Switzerland", ["瑞士"], ["switzerland", "zurich"]),
    country!("SE", "Sweden", ["瑞典"], ["sweden", "stockholm"]),
    country!("IE", "Ireland", ["爱尔兰", "愛爾蘭"], ["ireland", "dublin"]),
    country!("PL", "Poland", ["波兰", "波蘭"], ["poland", "warsaw"]),
    country!("UA", "Ukraine", ["乌克兰", "烏克蘭"], ["ukraine", "kyiv"]),
    country!("BR", "Brazil", ["巴西"], ["brazil"]),
    country!("AR", "Argentina", ["阿根廷"], ["argentina"]),
    country!("MX", "Mexico", ["墨西哥"], ["mexico"]),
    country!("CL", "Chile", ["智利"], ["chile"]),
    country!("ZA", "South Africa", ["南非"], ["south ?africa"]),
];

lazy_static! {
    static ref ASCII_PATTERNS: Vec<Regex> = COUNTRIES
        .iter()
        .map(|c| {
            let mut alternatives = vec![c.code.to_string()];
            alternatives.extend(c.english.iter().map(|e| format!("(?i:{})", e)));
            Regex::new(&format!(
                r"(?:^|[^A-Za-z0-9])(?:{})(?:[^A-Za-z]|$)",
                alternatives.join("|")
            ))
            .unwrap()
        })
        .collect();
}

impl Country {
    /// Name of the proxy group holding this country's proxies.
    pub fn group_name(&self) -> String {
        match country_code_to_flag(self.code) {
            Some(flag) => format!("{} {}", flag, self.name),
            None => self.name.to_string(),
        }
    }
}

/// Country a proxy name belongs to, if any.
pub fn classify(name: &str) -> Option<&'static Country> {
    if let Some(code) = extract_flag_code(name) {
        if let Some(country) = find_by_code(&code) {
            return Some(country);
        }
    }
    if let Some(country) = COUNTRIES
        .iter()
        .find(|c| c.keywords.iter().any(|kw| name.contains(kw)))
    {
        return Some(country);
    }
    COUNTRIES
        .iter()
        .zip(ASCII_PATTERNS.iter())
        .find(|(_, re)| re.is_match(name))
        .map(|(c, _)| c)
}

/// Look a country up by its two-letter code, ignoring case.
pub fn find_by_code(code: &str) -> Option<&'static Country> {
    COUNTRIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Check if a character is a Regional Indicator Symbol (U+1F1E6 to U+1F1FF).
fn is_regional_indicator(c: char) -> bool {
    (0x1F1E6..=0x1F1FF).contains(&(c as u32))
}

/// First flag emoji in `text`, as its two-letter code.
pub fn extract_flag_code(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).find_map(|pair| {
        if is_regional_indicator(pair[0]) && is_regional_indicator(pair[1]) {
            let letter = |c: char| (b'A' + (c as u32 - 0x1F1E6) as u8) as char;
            Some(format!("{}{}", letter(pair[0]), letter(pair[1])))
        } else {
            None
        }
    })
}

/// Convert a two-letter country code to a flag emoji.
pub fn country_code_to_flag(code: &str) -> Option<String> {
    let mut flag = String::new();
    let mut count = 0;
    for c in code.chars() {
        let upper = c.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        flag.push(char::from_u32(0x1F1E6 + (upper as u32 - 'A' as u32))?);
        count += 1;
    }
    if count == 2 {
        Some(flag)
    } else {
        None
    }
}
