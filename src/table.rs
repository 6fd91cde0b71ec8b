use ch7465lg_client::Downstream;
use comfy_table::{
    presets,
    Attribute,
    Cell,
    CellAlignment,
    Color,
    ContentArrangement,
    Table,
};

const HEADER: [&str; 9] = [
    "Channel",
    "Frequency (MHz)",
    "Power",
    "SNR",
    "RxMER",
    "Modulation",
    "Pre-RS errors",
    "Post-RS errors",
    "Locked (QAM/FEC/MPEG)",
];

/// Renders the downstream channels as a terminal table, sorted by channel id.
pub fn format_downstreams(downstreams: &[Downstream]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if downstreams.is_empty() {
        table.set_header(vec![Cell::new("No downstream channels reported").add_attribute(Attribute::Bold)]);
        return table.to_string();
    }

    table.set_header(
        HEADER
            .iter()
            .map(|title| Cell::new(title).add_attribute(Attribute::Bold).fg(Color::Cyan)),
    );

    let mut downstreams = downstreams.iter().collect::<Vec<_>>();
    downstreams.sort_by_key(|ds| ds.channel_id);

    for ds in downstreams {
        let numbers = [
            ds.channel_id.to_string(),
            format!("{:.1}", ds.frequency as f64 / 1_000_000.0),
            ds.power.to_string(),
            ds.snr.to_string(),
            format!("{:.2}", ds.rx_mer),
        ];
        let mut row = numbers
            .into_iter()
            .map(|value| Cell::new(value).set_alignment(CellAlignment::Right))
            .collect::<Vec<_>>();
        row.push(Cell::new(&ds.modulation));
        row.push(Cell::new(ds.pre_rs_errs).set_alignment(CellAlignment::Right));
        row.push(
            Cell::new(ds.post_rs_errs)
                .set_alignment(CellAlignment::Right)
                .fg(if ds.post_rs_errs > 0 { Color::Yellow } else { Color::Reset }),
        );
        row.push(lock_cell(ds));
        table.add_row(row);
    }

    table.to_string()
}

fn lock_cell(ds: &Downstream) -> Cell {
    let flags = [ds.qam_locked(), ds.fec_locked(), ds.mpeg_locked()];
    let text = flags
        .iter()
        .map(|locked| if *locked { "yes" } else { "no" })
        .collect::<Vec<_>>()
        .join("/");
    Cell::new(text).fg(if flags.iter().all(|locked| *locked) {
        Color::Green
    } else {
        Color::Red
    })
}
