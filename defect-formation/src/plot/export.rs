use crate::error::PlotError;
use std::io::Write;

/// Writes equally long `columns` under `headers` as CSV
///
/// Columns shorter than the longest leave their trailing cells empty.
pub(crate) fn write_columns<W: Write>(
    writer: W,
    headers: &[String],
    columns: &[&[f64]],
) -> Result<(), PlotError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(headers)?;
    let rows = columns.iter().map(|column| column.len()).max().unwrap_or(0);
    for row in 0..rows {
        writer.write_record(columns.iter().map(|column| {
            column
                .get(row)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::write_columns;

    #[test]
    fn ragged_columns_are_padded() {
        let mut buffer = Vec::new();
        write_columns(
            &mut buffer,
            &["x".to_string(), "y".to_string()],
            &[&[0., 1.], &[2.]],
        )
        .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "x,y\n0,2\n1,\n");
    }
}
