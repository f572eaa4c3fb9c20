//! Tabular workbook backend.
//!
//! The workbook is an `.xlsx` file with three sheets (`current`, `history`,
//! `analysis`). Row 1 of each sheet holds the header in `A1:D1`; data starts
//! at row 2 with columns start, end, task and delay. Only `current` is
//! written here. Every call loads the workbook, patches cells and saves it.

use super::{provisional_end, ReminderRecord, ReminderStore, ScheduledWindow};
use crate::core::{system_clock, Clock, DISPLAY_TIME_FORMAT};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Sheet names in workbook order
pub const REGIONS: [&str; 3] = ["current", "history", "analysis"];

/// Sheet that receives new reminders
pub const CURRENT_REGION: &str = "current";

/// Header cells written to `A1:D1` of every sheet
pub const HEADER: [&str; 4] = ["start", "end", "task", "delay_minutes"];

const HEADER_ROW: u32 = 1;
const FONT_SIZE: f64 = 16.0;

const START_COL: u32 = 1;
const END_COL: u32 = 2;
const TASK_COL: u32 = 3;
const DELAY_COL: u32 = 4;

pub struct SheetStore {
    path: PathBuf,
    clock: Clock,
}

impl SheetStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Spreadsheet> {
        umya_spreadsheet::reader::xlsx::read(&self.path)
            .map_err(|e| anyhow!("Failed to read workbook {}: {}", self.path.display(), e))
    }

    fn save(&self, book: &Spreadsheet) -> Result<()> {
        umya_spreadsheet::writer::xlsx::write(book, &self.path)
            .map_err(|e| anyhow!("Failed to save workbook {}: {}", self.path.display(), e))
    }

    /// Load the workbook, creating it or any missing sheet with its header
    fn load_or_create(&self) -> Result<Spreadsheet> {
        let mut book = if self.path.exists() {
            self.load()?
        } else {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
            info!("Creating workbook {}", self.path.display());
            umya_spreadsheet::new_file_empty_worksheet()
        };

        for region in REGIONS {
            if book.get_sheet_by_name(region).is_none() {
                let sheet = book
                    .new_sheet(region)
                    .map_err(|e| anyhow!("Failed to add sheet {region}: {e}"))?;
                write_header(sheet);
            }
        }
        Ok(book)
    }

    fn current_sheet(book: &Spreadsheet) -> Result<&Worksheet> {
        book.get_sheet_by_name(CURRENT_REGION)
            .ok_or_else(|| anyhow!("Workbook has no {CURRENT_REGION} sheet"))
    }

    fn current_sheet_mut(book: &mut Spreadsheet) -> Result<&mut Worksheet> {
        book.get_sheet_by_name_mut(CURRENT_REGION)
            .ok_or_else(|| anyhow!("Workbook has no {CURRENT_REGION} sheet"))
    }
}

fn write_header(sheet: &mut Worksheet) {
    for (col, title) in (START_COL..).zip(HEADER) {
        sheet.get_cell_mut((col, HEADER_ROW)).set_value_string(title);
        let font = sheet.get_style_mut((col, HEADER_ROW)).get_font_mut();
        font.set_bold(true);
        font.set_size(FONT_SIZE);
    }
}

fn set_text(sheet: &mut Worksheet, col: u32, row: u32, value: &str) {
    sheet.get_cell_mut((col, row)).set_value_string(value);
    sheet
        .get_style_mut((col, row))
        .get_font_mut()
        .set_size(FONT_SIZE);
}

fn has_start(sheet: &Worksheet, row: u32) -> bool {
    !sheet.get_value((START_COL, row)).trim().is_empty()
}

/// First data row with an empty A cell; gaps count as empty
fn next_empty_row(sheet: &Worksheet) -> u32 {
    let mut row = HEADER_ROW + 1;
    while has_start(sheet, row) {
        row += 1;
    }
    row
}

/// Last data row with a non-empty A cell
fn last_filled_row(sheet: &Worksheet) -> Option<u32> {
    (HEADER_ROW + 1..=sheet.get_highest_row())
        .rev()
        .find(|row| has_start(sheet, *row))
}

fn parse_delay(cell: &str) -> Option<u64> {
    let cell = cell.trim();
    cell.parse::<u64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0 && d.fract() == 0.0)
            .map(|d| d as u64)
    })
}

impl ReminderStore for SheetStore {
    fn write_reminder(&mut self, text: &str, delay_minutes: u64) -> Result<ScheduledWindow> {
        let start = (self.clock)();
        let end = provisional_end(start, delay_minutes)?;
        let window = ScheduledWindow {
            start_time: start.format(DISPLAY_TIME_FORMAT).to_string(),
            end_time: end.format(DISPLAY_TIME_FORMAT).to_string(),
        };

        let mut book = self.load_or_create()?;
        let sheet = Self::current_sheet_mut(&mut book)?;
        let row = next_empty_row(sheet);

        set_text(sheet, START_COL, row, &window.start_time);
        set_text(sheet, END_COL, row, &window.end_time);
        set_text(sheet, TASK_COL, row, text);
        sheet
            .get_cell_mut((DELAY_COL, row))
            .set_value_number(delay_minutes as f64);
        sheet
            .get_style_mut((DELAY_COL, row))
            .get_font_mut()
            .set_size(FONT_SIZE);

        self.save(&book)?;
        debug!("Wrote reminder to {} row {}", CURRENT_REGION, row);
        Ok(window)
    }

    fn update_completion(&mut self, _text: &str) -> Result<()> {
        if !self.path.exists() {
            debug!("No completion update, workbook {} missing", self.path.display());
            return Ok(());
        }

        let mut book = match self.load() {
            Ok(book) => book,
            Err(e) => {
                warn!("No completion update, workbook unreadable: {:#}", e);
                return Ok(());
            }
        };
        let Ok(sheet) = Self::current_sheet_mut(&mut book) else {
            warn!("No completion update, workbook has no {CURRENT_REGION} sheet");
            return Ok(());
        };
        let Some(last) = last_filled_row(sheet) else {
            return Ok(());
        };

        let completion = (self.clock)().format(DISPLAY_TIME_FORMAT).to_string();
        set_text(sheet, END_COL, last, &completion);
        self.save(&book)?;

        debug!("Marked {} row {} complete at {}", CURRENT_REGION, last, completion);
        Ok(())
    }

    fn records(&mut self) -> Result<Vec<ReminderRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let book = self.load()?;
        let sheet = Self::current_sheet(&book)?;

        Ok((HEADER_ROW + 1..=sheet.get_highest_row())
            .filter(|row| has_start(sheet, *row))
            .map(|row| {
                let end = sheet.get_value((END_COL, row));
                ReminderRecord {
                    start_time: sheet.get_value((START_COL, row)),
                    end_time: (!end.is_empty()).then_some(end),
                    task_text: sheet.get_value((TASK_COL, row)),
                    delay_minutes: parse_delay(&sheet.get_value((DELAY_COL, row))),
                }
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "sheet"
    }
}
