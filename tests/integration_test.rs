use peerdex::directory::advertise;
use peerdex::directory::{
    Advertisement, ConnectionSpeed, DirectoryClient, DirectoryServer, HostIdentity, SearchOutcome,
};
use peerdex::transfer::{TransferInitiator, TransferResponder};
use tokio::fs;

// Pull the transfer address out of one search reply line.
fn host_field(line: &str) -> Option<&str> {
    line.split(" | ")
        .find_map(|field| field.strip_prefix("Host: "))
}

#[tokio::test]
async fn discovered_files_can_be_fetched_from_their_host() -> anyhow::Result<()> {
    let server = DirectoryServer::bind("127.0.0.1:0", None).await?;
    let server_addr = server.local_addr()?;
    tokio::spawn(server.run());

    // The publishing host serves a real directory and registers under its
    // responder's actual address.
    let publisher_dir = tempfile::tempdir()?;
    fs::write(
        publisher_dir.path().join("holiday.jpg"),
        b"not really a jpeg",
    )
    .await?;

    let responder = TransferResponder::bind("127.0.0.1:0", publisher_dir.path(), None).await?;
    let responder_addr = responder.local_addr()?;
    tokio::spawn(responder.run());

    let identity = HostIdentity::new(
        "alice",
        responder_addr.ip().to_string(),
        responder_addr.port(),
        ConnectionSpeed::Fast,
    )?;
    let mut publisher = DirectoryClient::connect(server_addr).await?;
    publisher
        .register(
            &identity,
            &[Advertisement::new("holiday.jpg", "beach holiday photos")],
        )
        .await?;
    // A search on the same session forces the registration through before
    // anyone else looks for it.
    assert!(matches!(
        publisher.search("beach").await?,
        SearchOutcome::Matches(_)
    ));

    // The fetching host discovers the file, dials the advertised address
    // and retrieves it.
    let fetcher_dir = tempfile::tempdir()?;
    let mut fetcher = DirectoryClient::connect(server_addr).await?;
    fetcher
        .register(
            &HostIdentity::new("bob", "10.0.0.2", 9999, ConnectionSpeed::Slow)?,
            &[],
        )
        .await?;

    let lines = match fetcher.search("holiday").await? {
        SearchOutcome::Matches(lines) => lines,
        SearchOutcome::NoMatches => panic!("advertised file not discoverable"),
    };
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Filename: holiday.jpg"));

    let target = host_field(&lines[0]).expect("reply line carries the host address");
    let mut initiator = TransferInitiator::connect(target, fetcher_dir.path()).await?;
    initiator.retr("holiday.jpg").await?;
    assert_eq!(
        fs::read(fetcher_dir.path().join("holiday.jpg")).await?,
        b"not really a jpeg"
    );

    initiator.quit().await?;
    fetcher.quit().await?;
    publisher.quit().await?;
    Ok(())
}

#[tokio::test]
async fn a_file_list_on_disk_drives_the_advertisements() -> anyhow::Result<()> {
    let server = DirectoryServer::bind("127.0.0.1:0", None).await?;
    let server_addr = server.local_addr()?;
    tokio::spawn(server.run());

    let dir = tempfile::tempdir()?;
    let list_path = dir.path().join("filelist.txt");
    fs::write(
        &list_path,
        "song.mp3, smooth jazz\nbroken line\nnotes.txt, course notes\n",
    )
    .await?;

    let (ads, rejected) = advertise::load_file_list(&list_path).await?;
    assert_eq!(ads.len(), 2);
    assert_eq!(rejected, vec!["broken line".to_string()]);

    let mut client = DirectoryClient::connect(server_addr).await?;
    client
        .register(
            &HostIdentity::new("carol", "10.0.0.3", 4000, ConnectionSpeed::Medium)?,
            &ads,
        )
        .await?;

    match client.search("jazz").await? {
        SearchOutcome::Matches(lines) => {
            assert_eq!(lines.len(), 1);
            assert!(lines[0].contains("Filename: song.mp3"));
        }
        SearchOutcome::NoMatches => panic!("file list advertisement not searchable"),
    }

    client.quit().await?;
    Ok(())
}
