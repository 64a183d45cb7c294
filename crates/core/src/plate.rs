//! ELISA plate geometry.
//!
//! Plates are 8 rows (`A`-`H`) by 12 columns. Well locations are 1-based
//! and row-major, so location 13 is `B1`.

use crate::error::CoreError;

pub const PLATE_ROWS: u32 = 8;
pub const PLATE_COLUMNS: u32 = 12;
pub const PLATE_WELLS: u32 = PLATE_ROWS * PLATE_COLUMNS;

/// Validate that `location` addresses a well on a 96-well plate.
pub fn validate_location(location: u32) -> Result<(), CoreError> {
    if !(1..=PLATE_WELLS).contains(&location) {
        return Err(CoreError::Validation(format!(
            "Well location must be between 1 and {PLATE_WELLS}, got {location}"
        )));
    }
    Ok(())
}

/// Zero-based `(row, column)` of a location.
fn location_to_coords(location: u32) -> (u32, u32) {
    ((location - 1) / PLATE_COLUMNS, (location - 1) % PLATE_COLUMNS)
}

/// Row letter and 1-based column of a location, e.g. `13 -> ('B', 1)`.
pub fn location_to_grid(location: u32) -> Result<(char, u32), CoreError> {
    validate_location(location)?;
    let (row, col) = location_to_coords(location);
    // row < 8, always within 'A'..='H'
    let letter = char::from(b'A' + row as u8);
    Ok((letter, col + 1))
}

/// Location for a row letter and 1-based column; inverse of [`location_to_grid`].
pub fn grid_to_location(row: char, column: u32) -> Result<u32, CoreError> {
    let row = row.to_ascii_uppercase();
    if !('A'..='H').contains(&row) {
        return Err(CoreError::Validation(format!(
            "Plate row must be between A and H, got '{row}'"
        )));
    }
    if !(1..=PLATE_COLUMNS).contains(&column) {
        return Err(CoreError::Validation(format!(
            "Plate column must be between 1 and {PLATE_COLUMNS}, got {column}"
        )));
    }
    Ok((row as u32 - 'A' as u32) * PLATE_COLUMNS + column)
}

/// Short label of a location, e.g. `"H12"`.
pub fn location_label(location: u32) -> Result<String, CoreError> {
    let (row, col) = location_to_grid(location)?;
    Ok(format!("{row}{col}"))
}
