use std::time::Duration;

use peerdex::directory::{
    Advertisement, ConnectionSpeed, DirectoryClient, DirectoryServer, HostIdentity, SearchOutcome,
};
use tokio::net::TcpStream;

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn concurrent_registrations_are_all_recorded() -> anyhow::Result<()> {
    let server = DirectoryServer::bind("127.0.0.1:0", None).await?;
    let addr = server.local_addr()?;
    let registry = server.registry();
    tokio::spawn(server.run());

    let host_count: usize = 8;
    let mut tasks = Vec::new();
    for i in 0..host_count {
        tasks.push(tokio::spawn(async move {
            let identity = HostIdentity::new(
                format!("user{i}"),
                "10.9.0.1",
                6000 + i as u16,
                ConnectionSpeed::Medium,
            )?;
            let ads = vec![Advertisement::new(
                format!("file{i}.dat"),
                format!("payload {i} common"),
            )];

            let mut client = DirectoryClient::connect(addr).await?;
            client.register(&identity, &ads).await?;

            // Search for our own entry so the registration is fully applied
            // before this task reports done.
            match client.search(&format!("payload {i}")).await? {
                SearchOutcome::Matches(lines) => anyhow::ensure!(lines.len() == 1),
                SearchOutcome::NoMatches => anyhow::bail!("own registration not visible"),
            }
            anyhow::Ok(client)
        }));
    }

    // Keep the clients alive; dropping one would purge its entries.
    let mut clients = Vec::new();
    for task in tasks {
        clients.push(task.await??);
    }

    // No lost updates, no duplicates.
    assert_eq!(registry.len(), host_count);
    let mut owners: Vec<String> = registry
        .snapshot()
        .into_iter()
        .map(|entry| entry.owner)
        .collect();
    owners.sort();
    let expected: Vec<String> = (0..host_count).map(|i| format!("user{i}")).collect();
    assert_eq!(owners, expected);

    // A late arrival sees every host with a single search.
    let identity = HostIdentity::new("observer", "10.9.0.99", 7000, ConnectionSpeed::Fast)?;
    let mut observer = DirectoryClient::connect(addr).await?;
    observer.register(&identity, &[]).await?;
    match observer.search("common").await? {
        SearchOutcome::Matches(lines) => assert_eq!(lines.len(), host_count),
        SearchOutcome::NoMatches => panic!("expected every host to be visible"),
    }

    for client in clients {
        client.quit().await?;
    }
    observer.quit().await?;
    Ok(())
}

#[tokio::test]
async fn purging_one_host_never_disturbs_anothers_entries() -> anyhow::Result<()> {
    let server = DirectoryServer::bind("127.0.0.1:0", None).await?;
    let addr = server.local_addr()?;
    let registry = server.registry();
    tokio::spawn(server.run());

    let mut alice = DirectoryClient::connect(addr).await?;
    alice
        .register(
            &HostIdentity::new("alice", "10.9.1.1", 5001, ConnectionSpeed::Fast)?,
            &[
                Advertisement::new("a.txt", "alice data"),
                Advertisement::new("b.txt", "alice data too"),
            ],
        )
        .await?;

    let mut bob = DirectoryClient::connect(addr).await?;
    bob.register(
        &HostIdentity::new("bob", "10.9.1.2", 5002, ConnectionSpeed::Slow)?,
        &[Advertisement::new("c.txt", "bob data")],
    )
    .await?;

    assert!(wait_until(|| registry.len() == 3).await);

    // Alice leaves while bob keeps searching. Bob's entry must be in every
    // reply, whether it is observed before or after the purge.
    let quit_task = tokio::spawn(alice.quit());
    for _ in 0..20 {
        match bob.search("bob data").await? {
            SearchOutcome::Matches(lines) => {
                assert_eq!(lines.len(), 1);
                assert!(lines[0].contains("Host: 10.9.1.2:5002"));
            }
            SearchOutcome::NoMatches => panic!("bob's entry vanished during alice's purge"),
        }
    }
    quit_task.await??;

    assert!(wait_until(|| registry.len() == 1).await);
    assert_eq!(registry.snapshot()[0].owner, "bob");

    bob.quit().await?;
    Ok(())
}

#[tokio::test]
async fn an_idle_connection_does_not_block_other_sessions() -> anyhow::Result<()> {
    let server = DirectoryServer::bind("127.0.0.1:0", None).await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.run());

    // This connection never registers; its session task just waits.
    let _idle = TcpStream::connect(addr).await?;

    let mut bob = DirectoryClient::connect(addr).await?;
    bob.register(
        &HostIdentity::new("bob", "10.9.2.2", 5002, ConnectionSpeed::Medium)?,
        &[Advertisement::new("d.txt", "still responsive")],
    )
    .await?;

    match bob.search("responsive").await? {
        SearchOutcome::Matches(lines) => assert_eq!(lines.len(), 1),
        SearchOutcome::NoMatches => panic!("active session starved by an idle connection"),
    }

    bob.quit().await?;
    Ok(())
}
