//! Decoder registry
//!
//! A [`DecoderTable`] maps a link's scheme to the decoder that understands it.
//! The set of decoders is closed; a table only chooses which of them are
//! consulted and in what order.

use log::debug;

use crate::models::Proxy;
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::explodes::*;

/// One proxy link grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decoder {
    Shadowsocks,
    ShadowsocksR,
    VMess,
    Vless,
    Trojan,
    Hysteria,
    Hysteria2,
}

impl Decoder {
    /// Every decoder, in dispatch order.
    pub const ALL: [Decoder; 7] = [
        Decoder::ShadowsocksR,
        Decoder::Shadowsocks,
        Decoder::VMess,
        Decoder::Vless,
        Decoder::Trojan,
        Decoder::Hysteria2,
        Decoder::Hysteria,
    ];

    pub fn prefixes(self) -> &'static [&'static str] {
        match self {
            Decoder::Shadowsocks => SS_PREFIXES,
            Decoder::ShadowsocksR => SSR_PREFIXES,
            Decoder::VMess => VMESS_PREFIXES,
            Decoder::Vless => VLESS_PREFIXES,
            Decoder::Trojan => TROJAN_PREFIXES,
            Decoder::Hysteria => HYSTERIA_PREFIXES,
            Decoder::Hysteria2 => HYSTERIA2_PREFIXES,
        }
    }

    /// Whether `link` starts with one of this decoder's prefixes.
    pub fn matches(self, link: &str) -> bool {
        self.prefixes().iter().any(|p| link.starts_with(p))
    }

    pub fn parse(self, link: &str) -> Result<Proxy, ParseError> {
        match self {
            Decoder::Shadowsocks => explode_ss(link),
            Decoder::ShadowsocksR => explode_ssr(link),
            Decoder::VMess => explode_vmess(link),
            Decoder::Vless => explode_vless(link),
            Decoder::Trojan => explode_trojan(link),
            Decoder::Hysteria => explode_hysteria(link),
            Decoder::Hysteria2 => explode_hysteria2(link),
        }
    }
}

/// Ordered set of decoders consulted for each link; first prefix match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderTable {
    decoders: Vec<Decoder>,
}

impl Default for DecoderTable {
    fn default() -> Self {
        DecoderTable::builtin()
    }
}

impl DecoderTable {
    /// Table holding every supported decoder.
    pub fn builtin() -> Self {
        DecoderTable {
            decoders: Decoder::ALL.to_vec(),
        }
    }

    pub fn new(decoders: Vec<Decoder>) -> Self {
        DecoderTable { decoders }
    }

    pub fn decoders(&self) -> &[Decoder] {
        &self.decoders
    }

    /// Decoder claiming `link`, if any.
    pub fn find(&self, link: &str) -> Option<Decoder> {
        self.decoders.iter().copied().find(|d| d.matches(link))
    }

    /// Decode a single link.
    pub fn parse(&self, link: &str) -> Result<Proxy, ParseError> {
        let link = link.trim();
        match self.find(link) {
            Some(decoder) => decoder.parse(link),
            None => Err(ParseError::new(
                ParseErrorKind::InvalidPrefix,
                "no decoder for this scheme",
                link,
            )),
        }
    }

    /// Decode one link per line, skipping blank lines.
    ///
    /// The first undecodable line fails the whole list.
    pub fn parse_lines(&self, text: &str) -> Result<Vec<Proxy>, ParseError> {
        let mut proxies = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.parse(line) {
                Ok(proxy) => proxies.push(proxy),
                Err(err) => {
                    debug!("Failed to parse link line: {}", err);
                    return Err(err);
                }
            }
        }
        Ok(proxies)
    }
}
