//! Minimal WKT reader for ESRI `.prj` sidecars and OGC WKT1/WKT2 strings.

use super::epsg;
use crate::error::{Error, Result};

/// Deepest bracket nesting accepted; real `.prj` files stay below ten.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Text(String),
    Number(f64),
    Node(Node),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    keyword: String,
    args: Vec<Arg>,
}

impl Node {
    fn name(&self) -> Option<&str> {
        match self.args.first() {
            Some(Arg::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn number(&self, index: usize) -> Option<f64> {
        match self.args.get(index)? {
            Arg::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn child(&self, keywords: &[&str]) -> Option<&Node> {
        self.args.iter().find_map(|a| match a {
            Arg::Node(n) if keywords.iter().any(|k| n.keyword.eq_ignore_ascii_case(k)) => Some(n),
            _ => None,
        })
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { src: text.as_bytes(), pos: 0 }
    }

    fn fail(&self, what: &str) -> Error {
        Error::UnsupportedCrs(format!("malformed WKT at byte {}: {}", self.pos, what))
    }

    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn node(&mut self, depth: usize) -> Result<Node> {
        if depth > MAX_DEPTH {
            return Err(self.fail("nesting too deep"));
        }
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.fail("expected keyword"));
        }
        let keyword = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();

        self.skip_ws();
        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Ok(Node { keyword, args: Vec::new() }),
        };
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => self.pos += 1,
                Some(b'"') => args.push(Arg::Text(self.text()?)),
                Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => {
                    args.push(Arg::Number(self.number()?))
                }
                Some(_) => args.push(Arg::Node(self.node(depth + 1)?)),
                None => return Err(self.fail("unterminated bracket")),
            }
        }
        Ok(Node { keyword, args })
    }

    fn text(&mut self) -> Result<String> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') if self.src.get(self.pos + 1) == Some(&b'"') => {
                    out.push(b'"');
                    self.pos += 2;
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&out).into_owned());
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                None => return Err(self.fail("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || b"+-.eE".contains(&c)) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.fail("bad number"))
    }
}

fn normalized(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn epsg_authority(node: &Node) -> Option<u32> {
    let auth = node.child(&["AUTHORITY", "ID"])?;
    if !auth.name()?.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    match auth.args.get(1)? {
        Arg::Text(s) => s.trim().parse().ok(),
        Arg::Number(n) if *n > 0.0 => Some(*n as u32),
        _ => None,
    }
}

fn is_wgs84(node: &Node) -> bool {
    let named = |n: &Node| {
        n.name()
            .map(|s| {
                let s = normalized(s);
                s.contains("WGS84") || s.contains("WGS1984")
            })
            .unwrap_or(false)
    };
    named(node) || node.child(&["DATUM"]).map(named).unwrap_or(false)
}

fn utm_from_name(name: &str) -> Option<u32> {
    let upper = name.to_ascii_uppercase().replace('_', " ");
    let idx = upper.find("UTM ZONE ")?;
    let rest = &upper[idx + "UTM ZONE ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let zone: u32 = digits.parse().ok()?;
    if !(1..=60).contains(&zone) {
        return None;
    }
    match rest[digits.len()..].chars().next()? {
        'N' => Some(32600 + zone),
        'S' => Some(32700 + zone),
        _ => None,
    }
}

fn unsupported(node: &Node, reason: &str) -> Error {
    Error::UnsupportedCrs(format!("{}: {}", node.name().unwrap_or(&node.keyword), reason))
}

fn parameter(projcs: &Node, names: &[&str]) -> Option<f64> {
    projcs.args.iter().find_map(|a| match a {
        Arg::Node(n) if n.keyword.eq_ignore_ascii_case("PARAMETER") => {
            let key = normalized(n.name()?);
            if names.contains(&key.as_str()) {
                n.number(1)
            } else {
                None
            }
        }
        _ => None,
    })
}

/// Ellipsoid, datum shift and prime meridian of a geographic CRS node.
fn datum_params(geog: &Node) -> Result<String> {
    if let Some(unit) = geog.child(&["UNIT"]).and_then(|u| u.number(1)) {
        if (unit - std::f64::consts::PI / 180.0).abs() > 1e-10 {
            return Err(unsupported(geog, "angular unit is not degrees"));
        }
    }

    let mut params = if is_wgs84(geog) {
        "+datum=WGS84".to_string()
    } else {
        let datum = geog.child(&["DATUM"]).ok_or_else(|| unsupported(geog, "no DATUM"))?;
        let spheroid = datum
            .child(&["SPHEROID", "ELLIPSOID"])
            .ok_or_else(|| unsupported(datum, "no SPHEROID"))?;
        let (a, rf) = spheroid
            .number(1)
            .zip(spheroid.number(2))
            .ok_or_else(|| unsupported(spheroid, "missing axis or flattening"))?;
        let b = if rf == 0.0 { a } else { a * (1.0 - 1.0 / rf) };
        let towgs84 = match datum.child(&["TOWGS84"]) {
            Some(shift) => (0..shift.args.len())
                .filter_map(|i| shift.number(i))
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            None => "0,0,0".to_string(),
        };
        format!("+a={a} +b={b} +towgs84={towgs84}")
    };

    if let Some(pm) = geog.child(&["PRIMEM"]).and_then(|p| p.number(1)) {
        if pm != 0.0 {
            params.push_str(&format!(" +pm={pm}"));
        }
    }
    Ok(params)
}

/// proj definition of a WKT1 `PROJCS`.
fn projected_params(projcs: &Node) -> Result<String> {
    let geog = projcs.child(&["GEOGCS"]).ok_or_else(|| unsupported(projcs, "no GEOGCS"))?;
    let method = projcs
        .child(&["PROJECTION"])
        .and_then(|p| p.name())
        .map(normalized)
        .ok_or_else(|| unsupported(projcs, "no PROJECTION"))?;

    let to_meter = projcs.child(&["UNIT"]).and_then(|u| u.number(1)).unwrap_or(1.0);
    let lon_0 = parameter(projcs, &["CENTRALMERIDIAN", "LONGITUDEOFCENTER", "LONGITUDEOFNATURALORIGIN"]).unwrap_or(0.0);
    let lat_0 = parameter(projcs, &["LATITUDEOFORIGIN", "LATITUDEOFCENTER", "LATITUDEOFNATURALORIGIN"]).unwrap_or(0.0);
    let k = parameter(projcs, &["SCALEFACTOR", "SCALEFACTORATNATURALORIGIN"]).unwrap_or(1.0);
    let x_0 = parameter(projcs, &["FALSEEASTING"]).unwrap_or(0.0) * to_meter;
    let y_0 = parameter(projcs, &["FALSENORTHING"]).unwrap_or(0.0) * to_meter;
    let lat_ts = parameter(projcs, &["STANDARDPARALLEL1"]);

    let mut def = match method.as_str() {
        "TRANSVERSEMERCATOR" => {
            format!("+proj=tmerc +lat_0={lat_0} +lon_0={lon_0} +k={k} +x_0={x_0} +y_0={y_0} {}", datum_params(geog)?)
        }
        // ESRI's auxiliary sphere is the web-mercator sphere whatever the base datum says
        "MERCATORAUXILIARYSPHERE" => {
            format!("+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0={lon_0} +k=1 +x_0={x_0} +y_0={y_0}")
        }
        "MERCATOR" | "MERCATOR1SP" | "MERCATOR2SP" => {
            let scale = match lat_ts {
                Some(ts) => format!("+lat_ts={ts}"),
                None => format!("+k={k}"),
            };
            format!("+proj=merc {scale} +lon_0={lon_0} +x_0={x_0} +y_0={y_0} {}", datum_params(geog)?)
        }
        _ => return Err(unsupported(projcs, &format!("projection {method} not supported"))),
    };
    if to_meter != 1.0 {
        def.push_str(&format!(" +to_meter={to_meter}"));
    }
    def.push_str(" +no_defs");
    Ok(def)
}

/// What a WKT string resolved to.
pub(super) struct Resolved {
    pub epsg: Option<u32>,
    /// Built from the WKT tree when the code has no proj definition
    pub proj: Option<String>,
}

pub(super) fn resolve(text: &str) -> Result<Resolved> {
    let root = Parser::new(text.trim()).node(0)?;

    let authority = epsg_authority(&root);
    if let Some(code) = authority.filter(|c| epsg::proj_string(*c).is_some()) {
        return Ok(Resolved { epsg: Some(code), proj: None });
    }

    let name = root.name().unwrap_or("").to_string();
    let known = |code: u32| -> Result<Resolved> { Ok(Resolved { epsg: Some(code), proj: None }) };
    match root.keyword.to_ascii_uppercase().as_str() {
        "GEOGCS" if is_wgs84(&root) => known(epsg::WGS84),
        "GEOGCS" => Ok(Resolved {
            epsg: authority,
            proj: Some(format!("+proj=longlat {} +no_defs", datum_params(&root)?)),
        }),
        "GEOGCRS" | "GEODCRS" if is_wgs84(&root) => known(epsg::WGS84),
        "PROJCS" => {
            let base_is_wgs84 = root.child(&["GEOGCS"]).map(is_wgs84).unwrap_or(false);
            match utm_from_name(&name) {
                Some(code) if base_is_wgs84 => known(code),
                _ => Ok(Resolved { epsg: authority, proj: Some(projected_params(&root)?) }),
            }
        }
        "PROJCRS" => {
            let base_is_wgs84 = root.child(&["BASEGEOGCRS", "BASEGEODCRS"]).map(is_wgs84).unwrap_or(false);
            match utm_from_name(&name) {
                Some(code) if base_is_wgs84 => known(code),
                _ => Err(Error::UnsupportedCrs(name)),
            }
        }
        _ => Err(Error::UnsupportedCrs(name)),
    }
}
