use crate::coverage::{sum_counters, Class, Counter, CounterKind, Method, Package, Report};
use crate::errors::CrvError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct XmlReport {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "package", default)]
    packages: Vec<XmlPackage>,
    #[serde(rename = "counter", default)]
    counters: Vec<XmlCounter>,
}

#[derive(Debug, Deserialize)]
struct XmlPackage {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "class", default)]
    classes: Vec<XmlClass>,
    #[serde(rename = "counter", default)]
    counters: Vec<XmlCounter>,
}

#[derive(Debug, Deserialize)]
struct XmlClass {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@sourcefilename", default)]
    source_file: String,
    #[serde(rename = "method", default)]
    methods: Vec<XmlMethod>,
    #[serde(rename = "counter", default)]
    counters: Vec<XmlCounter>,
}

#[derive(Debug, Deserialize)]
struct XmlMethod {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@desc", default)]
    desc: String,
    #[serde(rename = "@line", default)]
    line: u32,
    #[serde(rename = "counter", default)]
    counters: Vec<XmlCounter>,
}

#[derive(Debug, Deserialize)]
struct XmlCounter {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "@missed", default)]
    missed: u64,
    #[serde(rename = "@covered", default)]
    covered: u64,
}

/// Parses a JaCoCo XML report. A class, package or report that carries no
/// counters of its own gets the sum of the level below.
pub fn parse_jacoco(text: &str) -> Result<Report, CrvError> {
    let raw: XmlReport = quick_xml::de::from_str(text)
        .map_err(|e| CrvError::ReportParse(format!("decode xml: {e}")))?;

    let mut packages = Vec::with_capacity(raw.packages.len());
    for xml_package in raw.packages {
        let mut classes = Vec::with_capacity(xml_package.classes.len());
        for xml_class in xml_package.classes {
            let methods = xml_class
                .methods
                .into_iter()
                .map(|xml_method| {
                    Ok(Method {
                        name: xml_method.name,
                        desc: xml_method.desc,
                        line: xml_method.line,
                        counters: decode_counters(xml_method.counters)?,
                    })
                })
                .collect::<Result<Vec<_>, CrvError>>()?;
            let mut counters = decode_counters(xml_class.counters)?;
            if counters.is_empty() {
                counters = sum_counters(methods.iter().map(|method| method.counters.as_slice()));
            }
            classes.push(Class {
                name: xml_class.name,
                source_file: xml_class.source_file,
                methods,
                counters,
            });
        }

        let mut counters = decode_counters(xml_package.counters)?;
        if counters.is_empty() {
            counters = sum_counters(classes.iter().map(|class| class.counters.as_slice()));
        }
        packages.push(Package {
            name: xml_package.name,
            classes,
            counters,
        });
    }

    let mut counters = decode_counters(raw.counters)?;
    if counters.is_empty() {
        counters = sum_counters(packages.iter().map(|package| package.counters.as_slice()));
    }

    Ok(Report {
        name: raw.name,
        packages,
        counters,
    })
}

fn decode_counters(raw: Vec<XmlCounter>) -> Result<Vec<Counter>, CrvError> {
    raw.into_iter()
        .map(|counter| {
            let kind = CounterKind::parse(&counter.kind).ok_or_else(|| {
                CrvError::ReportParse(format!("unsupported counter type: {}", counter.kind))
            })?;
            Ok(Counter::new(kind, counter.missed, counter.covered))
        })
        .collect()
}
