//! Read the Apollo SM number an IPMC has stored in its EEPROM

use tracing::info;

use crate::config::InfoConfig;
use crate::eeprom;
use crate::error::Result;
use crate::ipmc_client::IpmcClient;

pub async fn sm_number(config: &InfoConfig) -> Result<u32> {
    let mut client = IpmcClient::connect(&config.endpoint(), config.timeout).await?;
    let output = client.send_command(&format!("{}\r\n", eeprom::READ_COMMAND)).await?;
    let number = eeprom::parse_sm_number(&output)?;
    info!("IPMC at {} reports SM{}", client.endpoint(), number);
    Ok(number)
}
