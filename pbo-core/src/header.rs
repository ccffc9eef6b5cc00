use alloc::string::String;
use alloc::vec::Vec;
use core::slice::Iter;
use core::str;

use crate::cursor::{read_exact, scan_until};
use crate::{ArchiveSrc, Error, PackingMethod, Record, NULL_TERM, PROPERTIES_TERM, SCAN_LIMIT};

/// Ordered string properties carried by the archive header.
///
/// Insertion order is kept and inserting an existing key replaces its value
/// in place. A property with an empty value is stored as a bare key, so it
/// only reads back unchanged when it is the last property.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    pairs: Vec<(String, String)>,
}

impl Properties {
    pub fn new() -> Properties {
        Properties::default()
    }

    /// The properties every written archive starts out with
    pub fn seeded(
        prefix: impl Into<String>,
        product: impl Into<String>,
        version: impl Into<String>,
    ) -> Properties {
        let mut properties = Properties::new();
        properties.insert("prefix", prefix);
        properties.insert("product", product);
        properties.insert("version", version);
        properties
    }

    /// Returns the previous value if `key` was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(core::mem::replace(existing, value)),
            None => {
                self.pairs.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> Iter<'_, (String, String)> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append the property block, closing empty key included.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        for (key, value) in self.pairs.iter() {
            if key.is_empty() {
                return Err(Error::EmptyKey);
            }
            push_str(out, key)?;
            if !value.is_empty() {
                push_str(out, value)?;
            }
        }
        out.push(0);
        Ok(())
    }

    /// Parse a block as returned by [`Properties::read_block`].
    pub fn decode(block: &[u8]) -> Result<Properties, Error> {
        let mut properties = Properties::new();
        if block == NULL_TERM {
            return Ok(properties);
        }
        let body = block
            .strip_suffix(PROPERTIES_TERM)
            .ok_or(Error::TruncatedRead)?;

        let mut fields = body.split(|b| *b == 0);
        while let Some(key) = fields.next() {
            if key.is_empty() {
                return Err(Error::EmptyKey);
            }
            let key = str::from_utf8(key)?;
            let value = match fields.next() {
                Some(value) => str::from_utf8(value)?,
                None => "",
            };
            properties.insert(key, value);
        }
        Ok(properties)
    }

    /// Read the raw property block starting at `offset`, terminator included.
    pub fn read_block<S: ArchiveSrc>(src: &mut S, offset: u64) -> Result<Vec<u8>, S::Err> {
        let mut first = [0; 1];
        read_exact(src, offset, &mut first)?;
        if first[0] == 0 {
            return Ok(first.to_vec());
        }
        scan_until(src, offset, PROPERTIES_TERM, SCAN_LIMIT)
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a (String, String);
    type IntoIter = Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn push_str(out: &mut Vec<u8>, value: &str) -> Result<(), Error> {
    if value.as_bytes().contains(&0) {
        return Err(Error::InteriorNul);
    }
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    Ok(())
}

/// The `Version` record leading an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub(crate) record: Record,
    pub(crate) properties: Properties,
}

impl Header {
    pub fn new(properties: Properties) -> Header {
        Header {
            record: Record {
                packing_method: PackingMethod::Version,
                ..Record::default()
            },
            properties,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::Properties;
    use crate::Error;

    #[test]
    fn insert_overwrites_in_place() {
        let mut properties = Properties::seeded("a", "b", "1");
        assert_eq!(properties.insert("product", "c"), Some("b".into()));
        let keys: Vec<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["prefix", "product", "version"]);
        assert_eq!(properties.get("product"), Some("c"));
    }

    #[test]
    fn block_layout() {
        let properties = Properties::seeded("p", "q", "7");
        let mut out = Vec::new();
        properties.encode_into(&mut out).unwrap();
        assert_eq!(out, b"prefix\0p\0product\0q\0version\07\0\0");
        assert_eq!(Properties::decode(&out).unwrap(), properties);
    }

    #[test]
    fn empty_block() {
        let mut out = Vec::new();
        Properties::new().encode_into(&mut out).unwrap();
        assert_eq!(out, b"\0");
        assert!(Properties::decode(&out).unwrap().is_empty());

        let mut src = &b"\0more"[..];
        assert_eq!(Properties::read_block(&mut src, 0).unwrap(), b"\0");
    }

    #[test]
    fn trailing_bare_key() {
        let mut properties = Properties::seeded("p", "q", "7");
        properties.insert("flag", "");
        let mut out = Vec::new();
        properties.encode_into(&mut out).unwrap();
        assert!(out.ends_with(b"flag\0\0"));

        let mut src = &out[..];
        let block = Properties::read_block(&mut src, 0).unwrap();
        assert_eq!(block.len(), out.len());
        assert_eq!(Properties::decode(&block).unwrap(), properties);
    }

    #[test]
    fn rejects_unencodable() {
        let mut out = Vec::new();
        let mut properties = Properties::new();
        properties.insert("", "value");
        assert!(matches!(properties.encode_into(&mut out), Err(Error::EmptyKey)));

        let mut properties = Properties::new();
        properties.insert("key", "va\0lue");
        assert!(matches!(properties.encode_into(&mut out), Err(Error::InteriorNul)));
    }
}
