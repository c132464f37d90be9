// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use cmd::{ServeSummary, config_command_as_string, serve_with_io};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use upcall::{OpNum, ServerConfig};

#[tokio::test]
async fn test_session_summary_lists_pending() -> anyhow::Result<()> {
    let (client, server) = tokio::io::duplex(16 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, mut client_write) = tokio::io::split(client);

    let input = concat!(
        r#"{"upcall":"replica","opnum":1,"request":{"op":"MAKE_DIRECTORY","path":"/a"}}"#,
        "\n",
        r#"{"upcall":"replica","opnum":2,"request":{"op":"MAKE_DIRECTORY","path":"/b"}}"#,
        "\n",
        r#"{"upcall":"commit","opnum":1}"#,
        "\n",
        r#"{"upcall":"shutdown"}"#,
        "\n",
    );
    client_write.write_all(input.as_bytes()).await?;

    let summary = serve_with_io(
        ServerConfig::default(),
        BufReader::new(server_read),
        server_write,
    )
    .await?;
    assert_eq!(
        summary,
        ServeSummary {
            frames: 4,
            pending: vec![OpNum::new(2)],
        }
    );

    let mut lines = BufReader::new(client_read).lines();
    let mut replies = Vec::new();
    while let Some(line) = lines.next_line().await? {
        replies.push(line);
    }
    assert_eq!(
        replies,
        vec![
            r#"{"success":true}"#,
            r#"{"success":true}"#,
            r#"{"status":"ok"}"#,
            r#"{"status":"ok"}"#,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_listing_limit_from_config() -> anyhow::Result<()> {
    let config = ServerConfig {
        listing_limit: 1,
        ..ServerConfig::default()
    };
    let (client, server) = tokio::io::duplex(16 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, mut client_write) = tokio::io::split(client);

    let input = concat!(
        r#"{"upcall":"replica","opnum":1,"request":{"op":"MAKE_DIRECTORY","path":"/a"}}"#,
        "\n",
        r#"{"upcall":"replica","opnum":2,"request":{"op":"MAKE_DIRECTORY","path":"/b"}}"#,
        "\n",
        r#"{"upcall":"replica","opnum":3,"request":{"op":"LIST","path":"/"}}"#,
        "\n",
    );
    client_write.write_all(input.as_bytes()).await?;
    client_write.shutdown().await?;

    let summary = serve_with_io(config, BufReader::new(server_read), server_write).await?;
    assert_eq!(summary.frames, 3);

    let mut lines = BufReader::new(client_read).lines();
    let mut last = None;
    while let Some(line) = lines.next_line().await? {
        last = Some(line);
    }
    let reply = upcall::Reply::decode(last.unwrap_or_default().as_bytes())?;
    let listing = reply.listing().unwrap()?;
    assert_eq!(listing.partial_listing.len(), 1);
    assert_eq!(listing.remaining_entries, 1);
    Ok(())
}

#[test]
fn test_config_output() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "rollback_check: strict")?;

    let yaml = config_command_as_string(Some(file.path().to_path_buf()))?;
    let config = ServerConfig::from_yaml(&yaml)?;
    assert_eq!(config.rollback_check, upcall::RollbackCheck::Strict);
    assert_eq!(config.listing_limit, 1000);
    Ok(())
}

#[test]
fn test_config_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = config_command_as_string(Some(dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("nope.yaml"));
}
