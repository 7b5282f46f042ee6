//! Timetable scraper for wroclaw.pl.
//!
//! The timetable index lists line links under one `h2.titleSection` header
//! per vehicle kind. Each line page holds one `div.accordionContent` per
//! direction, with the direction's terminals and its ordered stops.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use mpk_transit::api_types::VehicleKind;
use mpk_transit::catalog::{CatalogDirection, CatalogLine, CatalogStop, RouteCatalog};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Map;

pub const BASE_URL: &str = "https://www.wroclaw.pl";
pub const TIMETABLE_PATH: &str = "/komunikacja/rozklady-jazdy";

/// Street recorded for stops whose page shows none
pub const UNKNOWN_STREET: &str = "N/A";

const SECTIONS: [(&str, VehicleKind); 2] = [
    ("Tramwaj", VehicleKind::Tram),
    ("Autobus dzienny", VehicleKind::Bus),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLink {
    pub url: String,
    pub kind: VehicleKind,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css:?}: {e}"))
}

/// Concatenated text with every fragment trimmed
fn text_of(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

pub struct TimetableParser {
    section_header: Selector,
    line_link: Selector,
    direction_block: Selector,
    direction_label: Selector,
    direction_part: Selector,
    stop_list: Selector,
    stop_item: Selector,
    stop_name: Selector,
    stop_street: Selector,
    line_name: Regex,
}

impl TimetableParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            section_header: selector("h2.titleSection")?,
            line_link: selector(r#"a[href*="/komunikacja/linia-"]"#)?,
            direction_block: selector("div.accordionContent")?,
            direction_label: selector("div.busDirection")?,
            direction_part: selector("span")?,
            stop_list: selector("ul.accordionList")?,
            stop_item: selector("li.listItem")?,
            stop_name: selector("a.label")?,
            stop_street: selector("span.topLabel")?,
            line_name: Regex::new(r"linia-([a-zA-Z0-9]+)-wroclaw")?,
        })
    }

    /// Line page links of the tram and day-bus sections, sorted by url
    pub fn line_links(&self, index_html: &str, base_url: &str) -> Vec<LineLink> {
        let document = Html::parse_document(index_html);
        let mut links = Vec::new();

        for (title, kind) in SECTIONS {
            let Some(header) = document
                .select(&self.section_header)
                .find(|header| text_of(*header) == title)
            else {
                log::warn!("No '{title}' section on the timetable page");
                continue;
            };
            let Some(list) = header
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "ul" && has_class(e, "busTimetableList"))
            else {
                log::warn!("'{title}' section has no line list");
                continue;
            };

            for anchor in list.select(&self.line_link) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let url = if href.starts_with('/') {
                    format!("{base_url}{href}")
                } else {
                    href.to_string()
                };
                links.push(LineLink { url, kind });
            }
        }

        links.sort_by(|a, b| a.url.cmp(&b.url));
        links.dedup();
        links
    }

    pub fn line_name(&self, url: &str) -> Option<String> {
        self.line_name
            .captures(url)
            .map(|captures| captures[1].to_string())
    }

    /// Directions of a line page. `None` when the page has no direction
    /// blocks at all; directions without a name or stops are dropped.
    pub fn directions(&self, line_html: &str) -> Option<Vec<CatalogDirection>> {
        let document = Html::parse_document(line_html);
        let blocks: Vec<_> = document.select(&self.direction_block).collect();
        if blocks.is_empty() {
            return None;
        }
        Some(blocks.into_iter().filter_map(|block| self.direction(block)).collect())
    }

    fn direction(&self, block: ElementRef<'_>) -> Option<CatalogDirection> {
        let label = block.select(&self.direction_label).next()?;
        let parts: Vec<String> = label
            .select(&self.direction_part)
            .map(text_of)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            return None;
        }

        let list = block.select(&self.stop_list).next()?;
        let stops: Vec<_> = list
            .select(&self.stop_item)
            .filter_map(|item| self.stop(item))
            .collect();
        if stops.is_empty() {
            return None;
        }

        Some(CatalogDirection {
            direction_name: parts.join(" -> "),
            kind: None,
            stops,
            extra: Map::new(),
        })
    }

    fn stop(&self, item: ElementRef<'_>) -> Option<CatalogStop> {
        let name = text_of(item.select(&self.stop_name).next()?);
        if name.is_empty() {
            return None;
        }
        let street = item
            .select(&self.stop_street)
            .next()
            .map(|span| text_of(span).replace(['(', ')'], ""))
            .unwrap_or_else(|| UNKNOWN_STREET.to_string());

        Some(CatalogStop {
            id: None,
            name,
            street: Some(street),
            lat: None,
            lon: None,
            extra: Map::new(),
        })
    }
}

pub struct Scraper {
    client: reqwest::Client,
    parser: TimetableParser,
    base_url: String,
    delay: Duration,
}

impl Scraper {
    pub fn new(base_url: &str, delay: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("route-data/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            parser: TimetableParser::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            delay,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Scrape every line into a fresh catalog. Lines whose page cannot be
    /// fetched or has no direction blocks are left out.
    pub async fn scrape(&self) -> Result<RouteCatalog> {
        let index_url = format!("{}{TIMETABLE_PATH}", self.base_url);
        let index = self
            .fetch(&index_url)
            .await
            .with_context(|| format!("Failed to fetch {index_url}"))?;

        let links = self.parser.line_links(&index, &self.base_url);
        if links.is_empty() {
            bail!("No line links found on {index_url}");
        }
        log::info!("Found {} line links", links.len());

        let mut catalog = RouteCatalog::new();
        for link in &links {
            if let Some((name, line)) = self.scrape_line(link).await {
                catalog.insert(name, line);
            }
            tokio::time::sleep(self.delay).await;
        }
        Ok(catalog)
    }

    async fn scrape_line(&self, link: &LineLink) -> Option<(String, CatalogLine)> {
        let Some(name) = self.parser.line_name(&link.url) else {
            log::warn!("Could not extract a line name from {}", link.url);
            return None;
        };
        log::info!("Scraping line {name} ({}) from {}", link.kind, link.url);

        let html = match self.fetch(&link.url).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Failed to fetch line {name}: {e:#}");
                return None;
            }
        };
        let Some(directions) = self.parser.directions(&html) else {
            log::warn!("No route information on the page of line {name}");
            return None;
        };
        log::debug!("Line {name}: {} directions", directions.len());

        Some((
            name,
            CatalogLine {
                kind: Some(link.kind.to_string()),
                directions,
                source: None,
                extra: Map::new(),
            },
        ))
    }
}
