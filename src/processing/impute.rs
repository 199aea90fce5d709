//! Missing-value imputation.

use crate::types::{DataType, Frame, SeriesAxis, Value};

/// Fill absent cells of numeric columns in place; returns the number of cells filled.
///
/// Interior gaps are interpolated linearly along the row axis, treating rows as equally spaced.
/// Leading and trailing gaps take the nearest present value. A numeric column with no present
/// value is left untouched, and so are text and boolean columns. Every column that received a
/// value becomes [`DataType::Float64`].
///
/// A frame whose series runs along its columns (a rank-1 vector laid out as one row) is
/// interpolated across its numeric cells instead, left to right, with the same boundary rule.
/// Any other single-row frame, such as one structured record, has nothing to interpolate from.
pub fn impute_missing(frame: &mut Frame) -> usize {
    if !frame.has_missing() {
        return 0;
    }
    if frame.series_axis == SeriesAxis::Columns && frame.row_count() == 1 {
        return impute_vector(frame);
    }

    let mut filled = 0;
    for col in 0..frame.column_count() {
        if !frame.schema.fields[col].data_type.is_numeric() {
            continue;
        }
        let column: Vec<Option<f64>> = frame.rows.iter().map(|row| row[col].as_f64()).collect();
        if column.iter().all(Option::is_some) || column.iter().all(Option::is_none) {
            continue;
        }

        let interpolated = interpolate(&column);
        frame.schema.fields[col].data_type = DataType::Float64;
        for ((row, before), after) in frame.rows.iter_mut().zip(&column).zip(interpolated) {
            if before.is_none() {
                filled += 1;
            }
            row[col] = after.map(Value::Float64).unwrap_or(Value::Null);
        }
    }
    filled
}

fn impute_vector(frame: &mut Frame) -> usize {
    let numeric: Vec<usize> = (0..frame.column_count())
        .filter(|&c| frame.schema.fields[c].data_type.is_numeric())
        .collect();
    let row = &mut frame.rows[0];
    let series: Vec<Option<f64>> = numeric.iter().map(|&c| row[c].as_f64()).collect();

    let mut filled = 0;
    for (&c, (before, after)) in numeric.iter().zip(series.iter().zip(interpolate(&series))) {
        if before.is_none() {
            if let Some(v) = after {
                row[c] = Value::Float64(v);
                frame.schema.fields[c].data_type = DataType::Float64;
                filled += 1;
            }
        }
    }
    filled
}

/// Linear interpolation with nearest-value extrapolation at both ends.
pub fn interpolate(column: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<(usize, f64)> = column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let (Some(&first), Some(&last)) = (present.first(), present.last()) else {
        return column.to_vec();
    };

    let mut out = Vec::with_capacity(column.len());
    // Index into `present` of the last known point at or before the current row.
    let mut k = 0;
    for (i, v) in column.iter().enumerate() {
        if let Some(v) = v {
            out.push(Some(*v));
            continue;
        }
        if i < first.0 {
            out.push(Some(first.1));
        } else if i > last.0 {
            out.push(Some(last.1));
        } else {
            while present[k + 1].0 < i {
                k += 1;
            }
            let (x0, y0) = present[k];
            let (x1, y1) = present[k + 1];
            out.push(Some(y0 + (y1 - y0) * (i - x0) as f64 / (x1 - x0) as f64));
        }
    }
    out
}
