//! OWS catalog clients and layer metadata lookup.
//!
//! Talks WCS and WFS 1.0.0 GetCapabilities only: enough to learn which
//! layers a server publishes and their descriptive metadata. Coverage
//! entries classify a layer as raster, feature entries as vector.

use crate::error::{Error, Result};
use crate::http::Session;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const OWS_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Raster,
    Vector,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Raster => "raster",
            LayerType::Vector => "vector",
        }
    }
}

/// One layer as advertised by a capabilities document.
///
/// `keywords` is `None` when the document exposes no keyword list for the
/// entry, `Some` (possibly with null members) when it does.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    /// WGS84 extent as (minx, miny, maxx, maxy).
    pub bounding_box_wgs84: [f64; 4],
    pub keywords: Option<Vec<Option<String>>>,
}

/// Published contents of one capabilities document, keyed by layer identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut catalog = Catalog::default();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    pub fn get(&self, layer_name: &str) -> Option<&CatalogEntry> {
        self.entries.get(layer_name)
    }

    pub fn contains(&self, layer_name: &str) -> bool {
        self.entries.contains_key(layer_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, name) in self.layer_names().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        write!(f, "]")
    }
}

/// Metadata fields common to raster and vector layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerMetadata {
    pub layer_type: LayerType,
    /// WGS84 extent as (minx, miny, maxx, maxy).
    pub bounding_box: [f64; 4],
    pub title: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<BTreeMap<String, Option<String>>>,
}

/// Coverage-protocol client for one server.
pub struct WebCoverageService {
    server_url: String,
    session: Session,
}

impl WebCoverageService {
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self {
            server_url: server_url.to_string(),
            session: Session::new()?,
        })
    }

    /// Fetches and parses the published coverage catalog.
    pub fn contents(&self) -> Result<Catalog> {
        log_status!("ows", "Querying WCS capabilities at {}", self.server_url);
        let url = capabilities_url(&self.server_url, "WCS");
        let body = self.session.fetch(&url)?;
        parse_wcs_capabilities(&String::from_utf8_lossy(&body))
    }
}

/// Feature-protocol client for one server.
pub struct WebFeatureService {
    server_url: String,
    session: Session,
}

impl WebFeatureService {
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self {
            server_url: server_url.to_string(),
            session: Session::new()?,
        })
    }

    /// Fetches and parses the published feature catalog.
    pub fn contents(&self) -> Result<Catalog> {
        log_status!("ows", "Querying WFS capabilities at {}", self.server_url);
        let url = capabilities_url(&self.server_url, "WFS");
        let body = self.session.fetch(&url)?;
        parse_wfs_capabilities(&String::from_utf8_lossy(&body))
    }
}

/// Looks up a layer's metadata on `server_url`, trying WCS then WFS.
///
/// A layer present in the coverage catalog is raster; otherwise, present in
/// the feature catalog, vector; otherwise the lookup fails with both
/// catalogs' contents in the error message.
pub fn get_layer_metadata(server_url: &str, layer_name: &str) -> Result<LayerMetadata> {
    let wcs = WebCoverageService::new(server_url)?;
    let wfs = WebFeatureService::new(server_url)?;

    let wcs_contents = wcs.contents()?;
    let wfs_contents = wfs.contents()?;

    resolve_metadata(server_url, layer_name, &wcs_contents, &wfs_contents)
}

fn resolve_metadata(
    server_url: &str,
    layer_name: &str,
    wcs_contents: &Catalog,
    wfs_contents: &Catalog,
) -> Result<LayerMetadata> {
    let (layer_type, entry) = if let Some(entry) = wcs_contents.get(layer_name) {
        (LayerType::Raster, entry)
    } else if let Some(entry) = wfs_contents.get(layer_name) {
        (LayerType::Vector, entry)
    } else {
        return Err(Error::LayerNotFound {
            layer_name: layer_name.to_string(),
            server_url: server_url.to_string(),
            wcs_contents: wcs_contents.to_string(),
            wfs_contents: wfs_contents.to_string(),
        });
    };

    Ok(LayerMetadata {
        layer_type,
        bounding_box: entry.bounding_box_wgs84,
        title: entry.title.clone(),
        id: entry.id.clone(),
        keywords: entry.keywords.as_deref().map(parse_keywords),
    })
}

/// Flattens keyword sources into a key/value map.
///
/// Null sources are skipped. Each source splits on commas; each token splits
/// on its first colon into key and value (no colon means no value). The last
/// occurrence of a duplicate key wins.
pub fn parse_keywords(sources: &[Option<String>]) -> BTreeMap<String, Option<String>> {
    let mut keywords = BTreeMap::new();

    for source in sources.iter().flatten() {
        for token in source.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once(':') {
                Some((key, value)) => keywords.insert(key.to_string(), Some(value.to_string())),
                None => keywords.insert(token.to_string(), None),
            };
        }
    }

    keywords
}

fn capabilities_url(server_url: &str, service: &str) -> String {
    let separator = if server_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}service={}&version={}&request=GetCapabilities",
        server_url, separator, service, OWS_VERSION
    )
}

fn capabilities_error(service: &'static str, detail: impl fmt::Display) -> Error {
    Error::Capabilities {
        service,
        detail: detail.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Leaf {
    #[default]
    None,
    Name,
    Title,
    Pos,
    Keyword,
    Keywords,
}

#[derive(Default)]
struct CoverageBuilder {
    id: String,
    title: String,
    corners: Vec<f64>,
    keywords: Option<Vec<Option<String>>>,
}

impl CoverageBuilder {
    fn commit(&mut self, field: Leaf, text: &str) -> Result<()> {
        match field {
            Leaf::Name => self.id = text.to_string(),
            Leaf::Title => self.title = text.to_string(),
            Leaf::Pos => {
                for token in text.split_whitespace() {
                    let value = token.parse().map_err(|_| {
                        capabilities_error(
                            "WCS",
                            format!("invalid coordinate {:?} in lonLatEnvelope", token),
                        )
                    })?;
                    self.corners.push(value);
                }
            }
            Leaf::Keyword => {
                let keywords = self.keywords.get_or_insert_with(Vec::new);
                if text.is_empty() {
                    keywords.push(None);
                } else {
                    keywords.push(Some(text.to_string()));
                }
            }
            Leaf::Keywords | Leaf::None => {}
        }
        Ok(())
    }

    fn build(self) -> Result<CatalogEntry> {
        if self.id.is_empty() {
            return Err(capabilities_error(
                "WCS",
                "CoverageOfferingBrief without a name",
            ));
        }
        if self.corners.len() < 4 {
            return Err(capabilities_error(
                "WCS",
                format!("incomplete lonLatEnvelope for {}", self.id),
            ));
        }

        Ok(CatalogEntry {
            bounding_box_wgs84: [
                self.corners[0],
                self.corners[1],
                self.corners[2],
                self.corners[3],
            ],
            id: self.id,
            title: self.title,
            keywords: self.keywords,
        })
    }
}

fn parse_wcs_capabilities(xml: &str) -> Result<Catalog> {
    let mut reader = Reader::from_str(xml);
    let mut catalog = Catalog::default();
    let mut current: Option<CoverageBuilder> = None;
    let mut field = Leaf::None;
    let mut text = String::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| capabilities_error("WCS", e))?
        {
            Event::Start(start) => match start.local_name().as_ref() {
                b"CoverageOfferingBrief" => current = Some(CoverageBuilder::default()),
                b"name" if current.is_some() => {
                    field = Leaf::Name;
                    text.clear();
                }
                b"label" if current.is_some() => {
                    field = Leaf::Title;
                    text.clear();
                }
                b"pos" if current.is_some() => {
                    field = Leaf::Pos;
                    text.clear();
                }
                b"keyword" if current.is_some() => {
                    field = Leaf::Keyword;
                    text.clear();
                }
                b"keywords" => {
                    if let Some(entry) = current.as_mut() {
                        entry.keywords.get_or_insert_with(Vec::new);
                    }
                }
                _ => {}
            },
            Event::Empty(start) => {
                if let Some(entry) = current.as_mut() {
                    match start.local_name().as_ref() {
                        b"keywords" => {
                            entry.keywords.get_or_insert_with(Vec::new);
                        }
                        b"keyword" => entry.keywords.get_or_insert_with(Vec::new).push(None),
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if field != Leaf::None {
                    text.push_str(&t.unescape().map_err(|e| capabilities_error("WCS", e))?);
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"CoverageOfferingBrief" {
                    if let Some(entry) = current.take() {
                        catalog.insert(entry.build()?);
                    }
                } else if field != Leaf::None {
                    if let Some(entry) = current.as_mut() {
                        entry.commit(field, text.trim())?;
                    }
                    field = Leaf::None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(catalog)
}

#[derive(Default)]
struct FeatureBuilder {
    id: String,
    title: String,
    bounding_box: Option<[f64; 4]>,
    keywords: Option<Vec<Option<String>>>,
}

impl FeatureBuilder {
    fn commit(&mut self, field: Leaf, text: &str) {
        match field {
            Leaf::Name => self.id = text.to_string(),
            Leaf::Title => self.title = text.to_string(),
            Leaf::Keywords => {
                let keywords = self.keywords.get_or_insert_with(Vec::new);
                if !text.is_empty() {
                    keywords.push(Some(text.to_string()));
                }
            }
            Leaf::Pos | Leaf::Keyword | Leaf::None => {}
        }
    }

    fn build(self) -> Result<CatalogEntry> {
        if self.id.is_empty() {
            return Err(capabilities_error("WFS", "FeatureType without a Name"));
        }
        let bounding_box_wgs84 = self.bounding_box.ok_or_else(|| {
            capabilities_error(
                "WFS",
                format!("FeatureType {} without a LatLongBoundingBox", self.id),
            )
        })?;

        Ok(CatalogEntry {
            id: self.id,
            title: self.title,
            bounding_box_wgs84,
            keywords: self.keywords,
        })
    }
}

fn bounding_box_from_attributes(start: &BytesStart) -> Result<[f64; 4]> {
    let mut minx = None;
    let mut miny = None;
    let mut maxx = None;
    let mut maxy = None;

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| capabilities_error("WFS", e))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| capabilities_error("WFS", e))?;

        let slot = match attribute.key.local_name().as_ref() {
            b"minx" => &mut minx,
            b"miny" => &mut miny,
            b"maxx" => &mut maxx,
            b"maxy" => &mut maxy,
            _ => continue,
        };
        *slot = Some(value.parse::<f64>().map_err(|_| {
            capabilities_error(
                "WFS",
                format!("invalid coordinate {:?} in LatLongBoundingBox", value),
            )
        })?);
    }

    match (minx, miny, maxx, maxy) {
        (Some(minx), Some(miny), Some(maxx), Some(maxy)) => Ok([minx, miny, maxx, maxy]),
        _ => Err(capabilities_error(
            "WFS",
            "LatLongBoundingBox missing a corner attribute",
        )),
    }
}

fn parse_wfs_capabilities(xml: &str) -> Result<Catalog> {
    let mut reader = Reader::from_str(xml);
    let mut catalog = Catalog::default();
    let mut current: Option<FeatureBuilder> = None;
    let mut field = Leaf::None;
    let mut text = String::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| capabilities_error("WFS", e))?
        {
            Event::Start(start) => match start.local_name().as_ref() {
                b"FeatureType" => current = Some(FeatureBuilder::default()),
                b"Name" if current.is_some() => {
                    field = Leaf::Name;
                    text.clear();
                }
                b"Title" if current.is_some() => {
                    field = Leaf::Title;
                    text.clear();
                }
                b"Keywords" if current.is_some() => {
                    field = Leaf::Keywords;
                    text.clear();
                }
                b"LatLongBoundingBox" => {
                    if let Some(entry) = current.as_mut() {
                        entry.bounding_box = Some(bounding_box_from_attributes(&start)?);
                    }
                }
                _ => {}
            },
            Event::Empty(start) => {
                if let Some(entry) = current.as_mut() {
                    match start.local_name().as_ref() {
                        b"LatLongBoundingBox" => {
                            entry.bounding_box = Some(bounding_box_from_attributes(&start)?);
                        }
                        b"Keywords" => {
                            entry.keywords.get_or_insert_with(Vec::new);
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if field != Leaf::None {
                    text.push_str(&t.unescape().map_err(|e| capabilities_error("WFS", e))?);
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"FeatureType" {
                    if let Some(entry) = current.take() {
                        catalog.insert(entry.build()?);
                    }
                } else if field != Leaf::None {
                    if let Some(entry) = current.as_mut() {
                        entry.commit(field, text.trim());
                    }
                    field = Leaf::None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(catalog)
}
