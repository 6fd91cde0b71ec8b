use crate::{
    client::{
        Client,
        Function,
    },
    error::{
        DecodeError,
        Result,
    },
};
use quick_xml::{
    events::Event,
    Reader,
};
use serde::{
    de,
    Deserialize,
    Deserializer,
    Serialize,
};
use std::{
    fmt::Display,
    str::FromStr,
};

const ROOT_ELEMENT: &str = "downstream_table";

/// PHY statistics of one bonded downstream channel, as reported by the modem.
///
/// Fields the modem leaves out keep their zero value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Downstream {
    /// Center frequency in Hz.
    #[serde(rename = "freq", deserialize_with = "empty_as_default")]
    pub frequency: i64,
    /// Power level in tenths of dBmV.
    #[serde(rename = "pow", deserialize_with = "empty_as_default")]
    pub power: i32,
    #[serde(deserialize_with = "empty_as_default")]
    pub snr: i32,
    #[serde(rename = "mod")]
    pub modulation: String,
    #[serde(rename = "chid", deserialize_with = "empty_as_default")]
    pub channel_id: i32,
    #[serde(rename = "RxMER", deserialize_with = "empty_as_default")]
    pub rx_mer: f64,
    #[serde(rename = "PreRs", deserialize_with = "empty_as_default")]
    pub pre_rs_errs: i64,
    #[serde(rename = "PostRs", deserialize_with = "empty_as_default")]
    pub post_rs_errs: i64,
    #[serde(rename = "IsQamLocked", deserialize_with = "empty_as_default")]
    pub is_qam_locked: i32,
    #[serde(rename = "IsFECLocked", deserialize_with = "empty_as_default")]
    pub is_fec_locked: i32,
    #[serde(rename = "IsMpegLocked", deserialize_with = "empty_as_default")]
    pub is_mpeg_locked: i32,
}

impl Downstream {
    pub fn qam_locked(&self) -> bool {
        self.is_qam_locked != 0
    }

    pub fn fec_locked(&self) -> bool {
        self.is_fec_locked != 0
    }

    pub fn mpeg_locked(&self) -> bool {
        self.is_mpeg_locked != 0
    }
}

/// Parses a number, reading an empty element (`<pow/>`) as zero.
fn empty_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let text = String::deserialize(deserializer)?;
    match text.trim() {
        "" => Ok(T::default()),
        text => text.parse().map_err(de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct DownstreamTable {
    #[serde(rename = "downstream", default)]
    downstreams: Vec<Downstream>,
}

/// Decodes the `downstream_table` document returned for
/// [`Function::DOWNSTREAM_TABLE`](crate::Function::DOWNSTREAM_TABLE).
pub fn decode(xml: &str) -> Result<Vec<Downstream>, DecodeError> {
    check_root(xml)?;
    let table: DownstreamTable = quick_xml::de::from_str(xml)?;
    Ok(table.downstreams)
}

fn check_root(xml: &str) -> Result<(), DecodeError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => {
                let name = element.name();
                return if name.as_ref() == ROOT_ELEMENT.as_bytes() {
                    Ok(())
                } else {
                    Err(DecodeError::UnexpectedRoot {
                        expected: ROOT_ELEMENT,
                        found: String::from_utf8_lossy(name.as_ref()).into_owned(),
                    })
                };
            }
            Event::Eof => return Err(DecodeError::MissingRoot),
            _ => {}
        }
    }
}

impl Client {
    /// Fetches the statistics of all bonded downstream channels.
    #[instrument(level = "debug", skip(self), fields(modem = %self.base_url()))]
    pub async fn downstreams(&self) -> Result<Vec<Downstream>> {
        let _state = self.state.lock().await;
        let body = self.post_getter(Function::DOWNSTREAM_TABLE).await?.text().await?;
        let downstreams = decode(&body)?;
        debug!(channels = downstreams.len(), "fetched downstream channels");
        Ok(downstreams)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unspecified_fields_are_zero() {
        let xml = "<downstream_table><downstream><chid>1</chid><pow>350</pow><snr>380</snr></downstream></downstream_table>";
        let downstreams = decode(xml).expect("valid table");
        assert_eq!(
            downstreams,
            vec![Downstream {
                channel_id: 1,
                power: 350,
                snr: 380,
                ..Default::default()
            }]
        );
    }

    #[test]
    fn empty_table_is_not_an_error() {
        assert_eq!(decode("<downstream_table></downstream_table>").expect("valid table"), vec![]);
        assert_eq!(decode("<downstream_table/>").expect("valid table"), vec![]);
    }

    #[test]
    fn decodes_full_channel() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<downstream_table>
  <downstream>
    <freq>602000000</freq>
    <pow>68</pow>
    <snr>40</snr>
    <mod>256qam</mod>
    <chid>3</chid>
    <RxMER>40.366287</RxMER>
    <PreRs>1862</PreRs>
    <PostRs>17</PostRs>
    <IsQamLocked>1</IsQamLocked>
    <IsFECLocked>1</IsFECLocked>
    <IsMpegLocked>0</IsMpegLocked>
  </downstream>
  <downstream>
    <freq>610000000</freq>
    <chid>4</chid>
  </downstream>
</downstream_table>"#;
        let downstreams = decode(xml).expect("valid table");
        assert_eq!(downstreams.len(), 2);

        let first = &downstreams[0];
        assert_eq!(first.frequency, 602_000_000);
        assert_eq!(first.power, 68);
        assert_eq!(first.snr, 40);
        assert_eq!(first.modulation, "256qam");
        assert_eq!(first.channel_id, 3);
        assert!((first.rx_mer - 40.366287).abs() < f64::EPSILON);
        assert_eq!(first.pre_rs_errs, 1862);
        assert_eq!(first.post_rs_errs, 17);
        assert!(first.qam_locked());
        assert!(first.fec_locked());
        assert!(!first.mpeg_locked());

        assert_eq!(downstreams[1].channel_id, 4);
        assert_eq!(downstreams[1].frequency, 610_000_000);
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let xml = "<downstream_table><ds_num>1</ds_num><downstream><chid>7</chid><extra>x</extra></downstream></downstream_table>";
        let downstreams = decode(xml).expect("valid table");
        assert_eq!(downstreams.len(), 1);
        assert_eq!(downstreams[0].channel_id, 7);
    }

    #[test]
    fn rejects_missing_root() {
        assert!(matches!(decode(""), Err(DecodeError::MissingRoot)));
        assert!(matches!(
            decode(r#"<?xml version="1.0"?>"#),
            Err(DecodeError::MissingRoot)
        ));
    }

    #[test]
    fn rejects_other_root() {
        let err = decode("<upstream_table></upstream_table>").expect_err("wrong root");
        assert!(matches!(
            err,
            DecodeError::UnexpectedRoot { found, .. } if found == "upstream_table"
        ));
    }

    #[test]
    fn rejects_malformed_values() {
        let xml = "<downstream_table><downstream><chid>one</chid></downstream></downstream_table>";
        assert!(decode(xml).is_err());
    }

    #[test]
    fn empty_numbers_are_zero() {
        let xml = "<downstream_table><downstream><chid>2</chid><pow/><snr> 38 </snr>\
<RxMER></RxMER><PreRs></PreRs><IsQamLocked/></downstream></downstream_table>";
        let downstreams = decode(xml).expect("valid table");
        assert_eq!(
            downstreams,
            vec![Downstream {
                channel_id: 2,
                snr: 38,
                ..Default::default()
            }]
        );
    }

    #[test]
    fn channels_may_be_separated_by_other_elements() {
        let xml = "<downstream_table><downstream><chid>1</chid></downstream><ds_num>2</ds_num>\
<downstream><chid>2</chid></downstream></downstream_table>";
        let channels = decode(xml)
            .expect("valid table")
            .iter()
            .map(|ds| ds.channel_id)
            .collect::<Vec<_>>();
        assert_eq!(channels, vec![1, 2]);
    }
}
