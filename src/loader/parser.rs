use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::api::scenario_dto::{DownloaderDto, HoldingDto, LinkDto, NodeStorageDto, ScenarioDto};
use crate::api::scheduler_config_dto::SchedulerConfigDto;
use crate::domain::scenario::Scenario;
use crate::domain::scheduler::SchedulerConfig;
use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path)?;

    let parsed_data: T = serde_json::from_str(&data)?;

    Ok(parsed_data)
}

/// Loads a scenario, choosing the format by extension: `.json` files hold a `ScenarioDto`,
/// everything else uses the line-based text protocol.
pub fn load_scenario(file_path: &str) -> Result<Scenario> {
    let is_json = Path::new(file_path).extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let dto = if is_json {
        parse_json_file::<ScenarioDto>(file_path)?
    } else {
        parse_scenario_text(&fs::read_to_string(file_path)?)?
    };

    log::info!(
        "Scenario '{}' read: {} nodes, {} links, {} downloaders, {} slots.",
        file_path,
        dto.node_num,
        dto.link_num,
        dto.downloader_num,
        dto.slot_num
    );

    Scenario::from_dto(dto)
}

pub fn load_config(file_path: &str) -> Result<SchedulerConfig> {
    let dto = parse_json_file::<SchedulerConfigDto>(file_path)?;
    Ok(SchedulerConfig::from_dto(dto))
}

/// Non-blank lines of the input together with their 1-based line numbers.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    last_line: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        Lines { inner: input.lines().enumerate(), last_line: 0 }
    }

    /// The next non-blank line, split into tokens.
    fn next_tokens(&mut self, section: &str) -> Result<(usize, Vec<&'a str>)> {
        for (index, line) in self.inner.by_ref() {
            self.last_line = index + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();

            if !tokens.is_empty() {
                return Ok((index + 1, tokens));
            }
        }

        Err(Error::ParseError { line: self.last_line + 1, message: format!("unexpected end of input, expected {}", section) })
    }

    fn remaining(&mut self) -> Option<usize> {
        self.inner.by_ref().find(|(_, line)| !line.trim().is_empty()).map(|(index, _)| index + 1)
    }
}

fn parse_number<T: FromStr>(token: &str, line: usize, what: &str) -> Result<T> {
    token.parse::<T>().map_err(|_| Error::ParseError { line, message: format!("invalid {} '{}'", what, token) })
}

/// Parses the text protocol:
///
/// ```text
/// nodeNum linkNum downloaderNum slotNum
/// src dst bw_1 .. bw_slotNum            (linkNum lines)
/// nodeId downloader size ..             (nodeNum lines)
/// downloaderNodeId consumingRate        (downloaderNum lines)
/// ```
///
/// Blank lines anywhere are ignored. Every section must have exactly the declared number of lines.
pub fn parse_scenario_text(input: &str) -> Result<ScenarioDto> {
    let mut lines = Lines::new(input);

    let (line, header) = lines.next_tokens("the header 'nodeNum linkNum downloaderNum slotNum'")?;
    if header.len() != 4 {
        return Err(Error::ParseError { line, message: format!("header needs 4 numbers, found {}", header.len()) });
    }

    let node_num: usize = parse_number(header[0], line, "nodeNum")?;
    let link_num: usize = parse_number(header[1], line, "linkNum")?;
    let downloader_num: usize = parse_number(header[2], line, "downloaderNum")?;
    let slot_num: usize = parse_number(header[3], line, "slotNum")?;

    let mut links: Vec<LinkDto> = Vec::with_capacity(link_num);
    for _ in 0..link_num {
        let (line, tokens) = lines.next_tokens("a link tuple")?;

        if tokens.len() != slot_num + 2 {
            return Err(Error::ParseError {
                line,
                message: format!("link tuple needs src, dst and {} bandwidth values, found {} tokens", slot_num, tokens.len()),
            });
        }

        let bandwidth = tokens[2..].iter().map(|t| parse_number::<i64>(t, line, "bandwidth")).collect::<Result<Vec<i64>>>()?;

        links.push(LinkDto { src: parse_number(tokens[0], line, "source node")?, dst: parse_number(tokens[1], line, "destination node")?, bandwidth });
    }

    let mut storage: Vec<NodeStorageDto> = Vec::with_capacity(node_num);
    for _ in 0..node_num {
        let (line, tokens) = lines.next_tokens("a storage row")?;

        if tokens.len() % 2 != 1 {
            return Err(Error::ParseError { line, message: "storage row needs a node id followed by (downloader, size) pairs".to_string() });
        }

        let holdings = tokens[1..]
            .chunks(2)
            .map(|pair| -> Result<HoldingDto> { Ok(HoldingDto { downloader_id: parse_number(pair[0], line, "downloader id")?, size: parse_number(pair[1], line, "stored size")? }) })
            .collect::<Result<Vec<HoldingDto>>>()?;

        storage.push(NodeStorageDto { node_id: parse_number(tokens[0], line, "node id")?, holdings });
    }

    let mut downloaders: Vec<DownloaderDto> = Vec::with_capacity(downloader_num);
    for _ in 0..downloader_num {
        let (line, tokens) = lines.next_tokens("a downloader row")?;

        if tokens.len() != 2 {
            return Err(Error::ParseError { line, message: format!("downloader row needs a node id and a consuming rate, found {} tokens", tokens.len()) });
        }

        downloaders.push(DownloaderDto { node_id: parse_number(tokens[0], line, "downloader node id")?, consuming_rate: parse_number(tokens[1], line, "consuming rate")? });
    }

    if let Some(line) = lines.remaining() {
        return Err(Error::ParseError { line, message: "unexpected content after the downloader section".to_string() });
    }

    Ok(ScenarioDto { node_num, link_num, downloader_num, slot_num, links, storage, downloaders })
}
